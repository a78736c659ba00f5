//! Serialized event loop driving usage refresh and self-update.
//!
//! One logical worker consumes a merged stream of timer ticks and
//! user-triggered actions and handles them strictly one at a time. Network
//! calls run on their own tasks with fixed timeouts; only their results
//! cross back into the loop.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{format_countdown, IconTier, Presenter, Urgency};
use crate::api::{self, UsageClient, UsageSnapshot};
use crate::cache::UsageCache;
use crate::config::Settings;
use crate::error::{CacheError, FetchError};
use crate::forecast::{self, ProjectionStatus, FIVE_HOUR_WINDOW, SEVEN_DAY_WINDOW};
use crate::notify::{Alert, ThresholdNotifier};
use crate::update::{self, Release};

/// Events consumed by the monitor loop.
#[derive(Debug)]
pub enum Event {
    /// Refresh usage now (user action; timer ticks take the same path)
    Refresh,
    /// Run an update check on its own task
    CheckUpdate,
    /// Apply the pending release and restart on success
    ApplyUpdate,
    /// Result of an update check posted back into the loop
    UpdateChecked(Option<Release>),
    /// Terminate the loop
    Quit,
}

/// Handle for posting user-triggered events into a running monitor.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<Event>,
}

impl MonitorHandle {
    /// Post an event. Returns false once the monitor has shut down.
    pub async fn send(&self, event: Event) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// The monitor: cache, client, notifier, and presenter behind one
/// serialized loop.
pub struct Monitor {
    settings: Settings,
    version: String,
    client: UsageClient,
    /// None when no per-user cache directory exists; every read is a miss
    cache: Option<UsageCache>,
    notifier: ThresholdNotifier,
    presenter: Box<dyn Presenter>,
    pending_release: Option<Release>,
    tx: mpsc::Sender<Event>,
    rx: mpsc::Receiver<Event>,
}

impl Monitor {
    pub fn new(
        settings: Settings,
        version: impl Into<String>,
        presenter: Box<dyn Presenter>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let cache = match UsageCache::new() {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("usage cache unavailable: {e}");
                None
            }
        };

        Self {
            settings,
            version: version.into(),
            client: UsageClient::new(),
            cache,
            notifier: ThresholdNotifier::new(),
            presenter,
            pending_release: None,
            tx,
            rx,
        }
    }

    /// Handle for user-triggered refresh/update/quit actions.
    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run until [`Event::Quit`]. Quit is cooperative: it takes effect at
    /// the next loop iteration, so in-flight work completes first.
    pub async fn run(mut self) {
        self.presenter.set_icon(IconTier::Gray);
        self.presenter.set_title("quotamon");
        self.presenter.set_tooltip("Claude usage monitor — loading...");

        self.refresh().await;

        // Startup update check on its own task so it never delays the
        // first usage display.
        if self.settings.check_updates {
            self.spawn_update_check();
        }

        let mut refresh_tick = tokio::time::interval(self.settings.poll_interval());
        let mut update_tick = tokio::time::interval(self.settings.update_check_interval());
        refresh_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        update_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // consume the immediate first tick of each interval
        refresh_tick.tick().await;
        update_tick.tick().await;

        loop {
            tokio::select! {
                _ = refresh_tick.tick() => self.refresh().await,
                _ = update_tick.tick() => {
                    if self.settings.check_updates {
                        self.spawn_update_check();
                    }
                }
                event = self.rx.recv() => {
                    let Some(event) = event else { break };
                    if !self.handle_event(event).await {
                        break;
                    }
                }
            }
        }

        info!("monitor stopped");
    }

    /// Handle one event. Returns false when the loop should terminate.
    async fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Refresh => {
                self.refresh().await;
                true
            }
            Event::CheckUpdate => {
                self.spawn_update_check();
                true
            }
            Event::ApplyUpdate => !self.apply_update().await,
            Event::UpdateChecked(release) => {
                self.on_update_checked(release);
                true
            }
            Event::Quit => false,
        }
    }

    /// Refresh pipeline: credentials, cache-or-fetch, projections,
    /// presentation, threshold alerting.
    async fn refresh(&mut self) {
        let creds = match api::read_credentials() {
            Ok(creds) if !creds.is_expired() => creds,
            Ok(_) => {
                self.set_expired();
                return;
            }
            Err(e) => {
                warn!("credentials: {e}");
                self.set_expired();
                return;
            }
        };

        let token = creds.access_token().to_string();
        let snapshot = match self.load_snapshot(token).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("usage fetch failed: {e}");
                self.presenter
                    .set_tooltip(&format!("Claude usage — fetch failed: {e}"));
                return;
            }
        };

        self.present(&snapshot);

        if let Some(alert) = self.notifier.observe(&snapshot) {
            let urgency = match alert {
                Alert::Critical(_) => Urgency::Critical,
                Alert::Warning(_) => Urgency::Normal,
            };
            self.presenter.notify(urgency, alert.title(), &alert.body());
        }
    }

    /// A fresh cache hit short-circuits the network; a live fetch runs on
    /// its own blocking task and rewrites the cache.
    async fn load_snapshot(&mut self, token: String) -> Result<UsageSnapshot, FetchError> {
        if let Some(cache) = &self.cache {
            match cache.read() {
                Ok(entry) if entry.is_valid() => {
                    debug!("using cached usage snapshot");
                    return Ok(entry.usage);
                }
                Ok(_) => debug!("cached usage snapshot is stale"),
                Err(CacheError::NotFound) => {}
                Err(e) => debug!("cache read failed, fetching live: {e}"),
            }
        }

        let client = self.client.clone();
        let snapshot = tokio::task::spawn_blocking(move || client.fetch_usage(&token))
            .await
            .map_err(|e| FetchError::Interrupted(e.to_string()))??;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(&snapshot) {
                // a missing cache just forces a live fetch next time
                warn!("cache write failed: {e}");
            }
        }

        Ok(snapshot)
    }

    /// Push projections for both windows through the presenter.
    fn present(&mut self, snapshot: &UsageSnapshot) {
        let now = chrono::Utc::now();
        let five = forecast::project(
            snapshot.five_hour.utilization,
            snapshot.five_hour.resets_at,
            FIVE_HOUR_WINDOW,
        );
        let seven = forecast::project(
            snapshot.seven_day.utilization,
            snapshot.seven_day.resets_at,
            SEVEN_DAY_WINDOW,
        );

        // the worse projection picks the icon color
        let tier = match five.status.max(seven.status) {
            ProjectionStatus::OverLimit => IconTier::Red,
            ProjectionStatus::Tight => IconTier::Yellow,
            ProjectionStatus::OnTrack => IconTier::Green,
        };
        self.presenter.set_icon(tier);

        self.presenter.set_title(&format!(
            "5h:{:.0}% 7d:{:.0}%",
            snapshot.five_hour.utilization, snapshot.seven_day.utilization
        ));

        self.presenter.set_tooltip(&format!(
            "Claude usage\n5h: {:.0}% — resets {} — {}\n7d: {:.0}% — resets {} — {}",
            snapshot.five_hour.utilization,
            format_countdown(snapshot.five_hour.resets_at.signed_duration_since(now)),
            five.status,
            snapshot.seven_day.utilization,
            format_countdown(snapshot.seven_day.resets_at.signed_duration_since(now)),
            seven.status,
        ));
    }

    fn set_expired(&mut self) {
        self.presenter.set_icon(IconTier::Gray);
        self.presenter.set_title("expired");
        self.presenter
            .set_tooltip("Claude — token expired; open Claude Code to reauthenticate");
    }

    /// Check the release feed on its own task; the result comes back into
    /// the serialized loop as [`Event::UpdateChecked`].
    fn spawn_update_check(&self) {
        let tx = self.tx.clone();
        let version = self.version.clone();
        tokio::spawn(async move {
            let outcome =
                tokio::task::spawn_blocking(move || update::check(&version)).await;
            let release = match outcome {
                Ok(Ok(release)) => release,
                Ok(Err(e)) => {
                    // silent; retried on the next interval
                    debug!("update check failed: {e}");
                    None
                }
                Err(e) => {
                    debug!("update check task failed: {e}");
                    None
                }
            };
            let _ = tx.send(Event::UpdateChecked(release)).await;
        });
    }

    fn on_update_checked(&mut self, release: Option<Release>) {
        let Some(release) = release else { return };
        info!("update available: {}", release.version);
        self.presenter.notify(
            Urgency::Low,
            "quotamon",
            &format!("Update {} available", release.version),
        );
        self.pending_release = Some(release);
    }

    /// Apply the pending release. Returns true when the process should
    /// exit because a replacement instance has been started.
    async fn apply_update(&mut self) -> bool {
        let Some(release) = self.pending_release.clone() else {
            debug!("apply requested with no pending release");
            return false;
        };

        info!("applying update {}", release.version);
        let url = release.url.clone();
        let outcome = tokio::task::spawn_blocking(move || update::apply(&url)).await;

        match outcome {
            Ok(Ok(())) => {
                self.pending_release = None;
                self.presenter.notify(
                    Urgency::Low,
                    "quotamon",
                    &format!(
                        "Updated to {} — restarting",
                        update::strip_v(&release.version)
                    ),
                );
                if let Err(e) = update::restart() {
                    // the updated binary stays installed for the next
                    // manual launch
                    warn!("restart failed: {e}");
                    self.presenter.notify(
                        Urgency::Normal,
                        "quotamon",
                        &format!("Update installed; restart failed: {e}"),
                    );
                    return false;
                }
                true
            }
            Ok(Err(e)) => {
                warn!("update apply failed: {e}");
                self.presenter
                    .notify(Urgency::Normal, "quotamon", &format!("Update failed: {e}"));
                false
            }
            Err(e) => {
                warn!("update apply task failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::api::UsageWindow;

    /// Presenter that records every call for assertions.
    #[derive(Debug, Default)]
    struct Recording {
        icons: Vec<IconTier>,
        titles: Vec<String>,
        tooltips: Vec<String>,
        notifications: Vec<(Urgency, String, String)>,
    }

    #[derive(Debug, Clone, Default)]
    struct RecordingPresenter {
        log: Arc<Mutex<Recording>>,
    }

    impl Presenter for RecordingPresenter {
        fn set_icon(&mut self, tier: IconTier) {
            self.log.lock().icons.push(tier);
        }
        fn set_title(&mut self, title: &str) {
            self.log.lock().titles.push(title.to_string());
        }
        fn set_tooltip(&mut self, tooltip: &str) {
            self.log.lock().tooltips.push(tooltip.to_string());
        }
        fn notify(&mut self, urgency: Urgency, title: &str, body: &str) {
            self.log
                .lock()
                .notifications
                .push((urgency, title.to_string(), body.to_string()));
        }
    }

    fn test_monitor() -> (Monitor, Arc<Mutex<Recording>>) {
        let presenter = RecordingPresenter::default();
        let log = presenter.log.clone();
        let monitor = Monitor::new(Settings::default(), "dev", Box::new(presenter));
        (monitor, log)
    }

    #[test]
    fn present_flags_the_critical_path() {
        // 82% with one hour left in the five-hour window projects past
        // 100%
        let (mut monitor, log) = test_monitor();
        let now = Utc::now();
        let snapshot = UsageSnapshot {
            five_hour: UsageWindow {
                utilization: 82.0,
                resets_at: now + Duration::hours(1),
            },
            seven_day: UsageWindow {
                utilization: 40.0,
                resets_at: now + Duration::days(3),
            },
        };

        monitor.present(&snapshot);

        let log = log.lock();
        assert_eq!(log.icons, vec![IconTier::Red]);
        assert_eq!(log.titles, vec!["5h:82% 7d:40%".to_string()]);
        assert!(log.tooltips[0].contains("over limit"));
    }

    #[test]
    fn present_stays_green_when_both_windows_are_calm() {
        let (mut monitor, log) = test_monitor();
        let now = Utc::now();
        let snapshot = UsageSnapshot {
            five_hour: UsageWindow {
                utilization: 10.0,
                resets_at: now + Duration::hours(1),
            },
            seven_day: UsageWindow {
                utilization: 20.0,
                resets_at: now + Duration::days(3),
            },
        };

        monitor.present(&snapshot);

        assert_eq!(log.lock().icons, vec![IconTier::Green]);
    }

    #[tokio::test]
    async fn quit_terminates_the_loop() {
        let (mut monitor, _log) = test_monitor();
        assert!(!monitor.handle_event(Event::Quit).await);
    }

    #[tokio::test]
    async fn update_checked_stores_the_release_and_notifies() {
        let (mut monitor, log) = test_monitor();
        let release = Release {
            version: "v9.9.9".to_string(),
            url: "https://example.invalid/quotamon".to_string(),
        };

        assert!(monitor
            .handle_event(Event::UpdateChecked(Some(release.clone())))
            .await);

        assert_eq!(monitor.pending_release, Some(release));
        let log = log.lock();
        assert_eq!(log.notifications.len(), 1);
        assert!(log.notifications[0].2.contains("v9.9.9"));
    }

    #[tokio::test]
    async fn update_checked_none_is_a_no_op() {
        let (mut monitor, log) = test_monitor();
        assert!(monitor.handle_event(Event::UpdateChecked(None)).await);
        assert!(monitor.pending_release.is_none());
        assert!(log.lock().notifications.is_empty());
    }

    #[tokio::test]
    async fn apply_without_pending_release_keeps_running() {
        let (mut monitor, _log) = test_monitor();
        assert!(monitor.handle_event(Event::ApplyUpdate).await);
    }

    #[tokio::test]
    async fn handle_outlives_send_after_shutdown() {
        let (monitor, _log) = test_monitor();
        let handle = monitor.handle();
        drop(monitor);
        assert!(!handle.send(Event::Refresh).await);
    }
}
