//! Terminal presenter for headless `quotamon monitor` runs.
//!
//! State transitions go to the log; alerts are forwarded to the desktop
//! notification service. Tray frontends implement the same trait against
//! their own toolkit.

use quotamon_core::monitor::{IconTier, Presenter, Urgency};
use tracing::{debug, info};

pub struct TerminalPresenter {
    tier: IconTier,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self {
            tier: IconTier::Gray,
        }
    }
}

impl Default for TerminalPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for TerminalPresenter {
    fn set_icon(&mut self, tier: IconTier) {
        if tier != self.tier {
            info!("status tier: {tier:?}");
            self.tier = tier;
        }
    }

    fn set_title(&mut self, title: &str) {
        info!("usage: {title}");
    }

    fn set_tooltip(&mut self, tooltip: &str) {
        debug!("detail: {}", tooltip.replace('\n', " | "));
    }

    fn notify(&mut self, urgency: Urgency, title: &str, body: &str) {
        info!("notify [{urgency:?}] {title}: {body}");
        send_desktop_notification(urgency, title, body);
    }
}

#[cfg(target_os = "linux")]
fn send_desktop_notification(urgency: Urgency, title: &str, body: &str) {
    let urgency = match urgency {
        Urgency::Low => "low",
        Urgency::Normal => "normal",
        Urgency::Critical => "critical",
    };
    let _ = std::process::Command::new("notify-send")
        .args(["-u", urgency, title, body])
        .status();
}

#[cfg(target_os = "macos")]
fn send_desktop_notification(_urgency: Urgency, title: &str, body: &str) {
    let script = format!("display notification {body:?} with title {title:?}");
    let _ = std::process::Command::new("osascript")
        .args(["-e", &script])
        .status();
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn send_desktop_notification(_urgency: Urgency, _title: &str, _body: &str) {}
