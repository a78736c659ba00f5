//! Hysteresis filter over successive usage snapshots.
//!
//! A single combined worst-of-both-windows signal drives alerting: each
//! tier fires once on an upward crossing and re-arms only after the value
//! drops back below the tier.

use parking_lot::Mutex;

use crate::api::UsageSnapshot;

const WARNING_PCT: f64 = 80.0;
const CRITICAL_PCT: f64 = 95.0;

/// Alert emitted on an upward threshold crossing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Alert {
    /// Worst-of-windows crossed 80%
    Warning(f64),
    /// Worst-of-windows crossed 95%
    Critical(f64),
}

impl Alert {
    /// Notification title.
    pub fn title(&self) -> &'static str {
        match self {
            Alert::Warning(_) => "Claude usage warning",
            Alert::Critical(_) => "Claude usage critical",
        }
    }

    /// Notification body.
    pub fn body(&self) -> String {
        match self {
            Alert::Warning(pct) => {
                format!("Usage at {pct:.0}% — on pace to reach limit before reset")
            }
            Alert::Critical(pct) => {
                format!("Usage at {pct:.0}% — rate limiting likely before reset")
            }
        }
    }
}

/// Threshold notifier with per-tier hysteresis.
///
/// Refreshes can race (timer tick vs. user action); the state
/// read-modify-write is one critical section and the lock is never held
/// across I/O.
#[derive(Debug, Default)]
pub struct ThresholdNotifier {
    state: Mutex<NotificationState>,
}

/// Last observed per-window percentages; the comparison baseline is their
/// max.
#[derive(Debug, Default)]
struct NotificationState {
    last_five_hour_pct: f64,
    last_seven_day_pct: f64,
}

impl ThresholdNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot and decide whether an alert fires.
    ///
    /// At most one alert per call; the critical tier is evaluated first
    /// and wins when both are newly crossed. State updates happen on every
    /// call, alert or not.
    pub fn observe(&self, snapshot: &UsageSnapshot) -> Option<Alert> {
        let pct = snapshot.worst_utilization();

        let prev = {
            let mut state = self.state.lock();
            let prev = state.last_five_hour_pct.max(state.last_seven_day_pct);
            state.last_five_hour_pct = snapshot.five_hour.utilization;
            state.last_seven_day_pct = snapshot.seven_day.utilization;
            prev
        };

        if pct >= CRITICAL_PCT && prev < CRITICAL_PCT {
            Some(Alert::Critical(pct))
        } else if pct >= WARNING_PCT && prev < WARNING_PCT {
            Some(Alert::Warning(pct))
        } else {
            None
        }
    }
}
