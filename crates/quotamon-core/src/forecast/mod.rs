//! Linear usage projection toward the window reset.
//!
//! Assumes usage accrues linearly within the window. That is a deliberate
//! simplification, not a fit to historical samples.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Rolling five-hour rate-limit window.
pub const FIVE_HOUR_WINDOW: Duration = Duration::from_secs(5 * 60 * 60);
/// Rolling seven-day rate-limit window.
pub const SEVEN_DAY_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const OVER_LIMIT_PCT: f64 = 100.0;
const TIGHT_PCT: f64 = 90.0;

/// Where utilization is headed by the time the window resets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Estimated utilization at window reset (0-100+)
    pub projected_pct: f64,
    /// Discrete tier for the estimate
    pub status: ProjectionStatus,
}

/// Discrete tier for a projection. Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProjectionStatus {
    /// Projected to stay under 100% at reset
    OnTrack,
    /// Projected to land at 90% or above
    Tight,
    /// Projected to reach 100% before reset
    OverLimit,
}

impl ProjectionStatus {
    fn classify(projected_pct: f64) -> Self {
        if projected_pct >= OVER_LIMIT_PCT {
            ProjectionStatus::OverLimit
        } else if projected_pct >= TIGHT_PCT {
            ProjectionStatus::Tight
        } else {
            ProjectionStatus::OnTrack
        }
    }

    /// Short human-readable label.
    pub fn indicator(self) -> &'static str {
        match self {
            ProjectionStatus::OverLimit => "over limit",
            ProjectionStatus::Tight => "tight",
            ProjectionStatus::OnTrack => "on track",
        }
    }
}

impl std::fmt::Display for ProjectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.indicator())
    }
}

/// Estimate where utilization lands at window reset.
///
/// `current_pct` is the utilization now, `resets_at` when the window
/// resets, `window_len` the total window length (5h or 7d).
pub fn project(current_pct: f64, resets_at: DateTime<Utc>, window_len: Duration) -> Projection {
    project_at(Utc::now(), current_pct, resets_at, window_len)
}

/// Clock-pinned variant of [`project`].
///
/// With no elapsed time or no usage there is no rate to extrapolate from;
/// those cases degenerate to the current utilization, on track.
pub fn project_at(
    now: DateTime<Utc>,
    current_pct: f64,
    resets_at: DateTime<Utc>,
    window_len: Duration,
) -> Projection {
    let remaining = resets_at.signed_duration_since(now).num_milliseconds() as f64 / 1000.0;
    let elapsed = window_len.as_secs_f64() - remaining;

    if elapsed <= 0.0 || current_pct <= 0.0 {
        return Projection {
            projected_pct: current_pct,
            status: ProjectionStatus::OnTrack,
        };
    }

    let rate = current_pct / elapsed;
    let projected = rate * window_len.as_secs_f64();

    Projection {
        projected_pct: projected,
        status: ProjectionStatus::classify(projected),
    }
}
