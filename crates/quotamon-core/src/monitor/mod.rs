//! Presentation seam and the monitor event loop.

mod scheduler;

pub use scheduler::{Event, Monitor, MonitorHandle};

/// Icon color tier derived from the worse of the two projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconTier {
    /// No data yet, or credentials unavailable
    Gray,
    /// Projected to stay under 90%
    Green,
    /// Projected to land at 90% or above
    Yellow,
    /// Projected to reach 100% before reset
    Red,
}

/// Desktop notification urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

/// Narrow capability interface to the platform presentation layer.
///
/// The monitor owns a boxed implementation passed in by the caller; core
/// never touches a tray handle or any other platform global. Tray, status
/// bar, and headless frontends each implement this against their own
/// toolkit.
pub trait Presenter: Send {
    /// Switch the displayed icon tier.
    fn set_icon(&mut self, tier: IconTier);
    /// Set the compact always-visible text (e.g. "5h:42% 7d:61%").
    fn set_title(&mut self, title: &str);
    /// Set the longer hover/detail text.
    fn set_tooltip(&mut self, tooltip: &str);
    /// Raise a user-facing notification.
    fn notify(&mut self, urgency: Urgency, title: &str, body: &str);
}

/// Compact countdown: "now", "32m", "1h05m", "2d3h".
pub fn format_countdown(delta: chrono::Duration) -> String {
    if delta < chrono::Duration::zero() {
        return "now".to_string();
    }

    // round to the nearest minute
    let total_mins = (delta.num_seconds() + 30) / 60;
    let days = total_mins / (24 * 60);
    let hours = (total_mins / 60) % 24;
    let mins = total_mins % 60;

    if days > 0 {
        format!("{days}d{hours}h")
    } else if hours > 0 {
        format!("{hours}h{mins:02}m")
    } else {
        format!("{mins}m")
    }
}
