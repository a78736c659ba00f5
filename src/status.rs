//! Terminal and JSON rendering for `quotamon status`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use quotamon_core::api::{self, UsageClient, UsageSnapshot};
use quotamon_core::cache::{CacheEntry, UsageCache};
use quotamon_core::forecast::{self, Projection, ProjectionStatus, FIVE_HOUR_WINDOW, SEVEN_DAY_WINDOW};
use quotamon_core::monitor::format_countdown;

const BAR_WIDTH: usize = 20;

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Whether color output is enabled (TTY + NO_COLOR not set)
fn use_color() -> bool {
    use std::io::IsTerminal;
    std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Run the status command. Returns the process exit code: 0 ok, 1 fetch
/// error, 2 credential/expiry error.
pub fn run(json: bool, plain: bool) -> i32 {
    let creds = match api::read_credentials() {
        Ok(creds) => creds,
        Err(e) => {
            eprintln!("quotamon: {e}");
            return 2;
        }
    };
    if creds.is_expired() {
        eprintln!("quotamon: token expired — open Claude Code to refresh");
        return 2;
    }

    let cache = UsageCache::new().ok();

    // A fresh cache hit skips the network entirely
    if let Some(entry) = cache
        .as_ref()
        .and_then(|cache| cache.read().ok())
        .filter(CacheEntry::is_valid)
    {
        render(&entry.usage, Some(&entry), json, plain);
        return 0;
    }

    let client = UsageClient::new();
    let usage = match client.fetch_usage(creds.access_token()) {
        Ok(usage) => usage,
        Err(e) => {
            eprintln!("quotamon: {e}");
            return 1;
        }
    };

    if let Some(cache) = &cache {
        if let Err(e) = cache.write(&usage) {
            tracing::warn!("cache write failed: {e}");
        }
    }

    render(&usage, None, json, plain);
    0
}

fn render(usage: &UsageSnapshot, cache_entry: Option<&CacheEntry>, json: bool, plain: bool) {
    if json {
        print_json(usage, cache_entry);
    } else if plain || !use_color() {
        print_plain(usage);
    } else {
        print_color(usage);
    }
}

fn projections(usage: &UsageSnapshot) -> (Projection, Projection) {
    (
        forecast::project(
            usage.five_hour.utilization,
            usage.five_hour.resets_at,
            FIVE_HOUR_WINDOW,
        ),
        forecast::project(
            usage.seven_day.utilization,
            usage.seven_day.resets_at,
            SEVEN_DAY_WINDOW,
        ),
    )
}

fn resets_in(resets_at: DateTime<Utc>) -> String {
    format_countdown(resets_at.signed_duration_since(Utc::now()))
}

fn bar(pct: f64) -> String {
    let filled = ((pct / 100.0 * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn pct_color(pct: f64) -> &'static str {
    if pct >= 80.0 {
        RED
    } else if pct >= 60.0 {
        YELLOW
    } else {
        GREEN
    }
}

fn color_indicator(projection: &Projection) -> String {
    match projection.status {
        ProjectionStatus::OverLimit => format!("{RED}⚠ over limit{RESET}"),
        ProjectionStatus::Tight => format!("{YELLOW}~ tight{RESET}"),
        ProjectionStatus::OnTrack => format!("{GREEN}✓ on track{RESET}"),
    }
}

fn print_color(usage: &UsageSnapshot) {
    let (five, seven) = projections(usage);
    let five_pct = usage.five_hour.utilization;
    let seven_pct = usage.seven_day.utilization;

    println!(
        "quotamon   5h {}{}{} {:3.0}%  resets {}  {}",
        pct_color(five_pct),
        bar(five_pct),
        RESET,
        five_pct,
        resets_in(usage.five_hour.resets_at),
        color_indicator(&five)
    );
    println!(
        "           7d {}{}{} {:3.0}%  resets {}  {}",
        pct_color(seven_pct),
        bar(seven_pct),
        RESET,
        seven_pct,
        resets_in(usage.seven_day.resets_at),
        color_indicator(&seven)
    );
}

fn print_plain(usage: &UsageSnapshot) {
    let (five, seven) = projections(usage);

    println!(
        "5h: {:.0}% (resets {}, {})  7d: {:.0}% (resets {}, {})",
        usage.five_hour.utilization,
        resets_in(usage.five_hour.resets_at),
        five.status,
        usage.seven_day.utilization,
        resets_in(usage.seven_day.resets_at),
        seven.status
    );
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    usage: &'a UsageSnapshot,
    forecast: JsonForecast,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<JsonCacheInfo>,
}

#[derive(Serialize)]
struct JsonForecast {
    five_hour: JsonProjection,
    seven_day: JsonProjection,
}

#[derive(Serialize)]
struct JsonProjection {
    projected_pct: f64,
    status: &'static str,
}

#[derive(Serialize)]
struct JsonCacheInfo {
    hit: bool,
    fetched_at: DateTime<Utc>,
}

impl From<&Projection> for JsonProjection {
    fn from(projection: &Projection) -> Self {
        Self {
            projected_pct: projection.projected_pct.round(),
            status: projection.status.indicator(),
        }
    }
}

fn print_json(usage: &UsageSnapshot, cache_entry: Option<&CacheEntry>) {
    let (five, seven) = projections(usage);

    let out = JsonOutput {
        usage,
        forecast: JsonForecast {
            five_hour: JsonProjection::from(&five),
            seven_day: JsonProjection::from(&seven),
        },
        cache: cache_entry.map(|entry| JsonCacheInfo {
            hit: true,
            fetched_at: entry.fetched_at,
        }),
    };

    match serde_json::to_string_pretty(&out) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("quotamon: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use quotamon_core::api::UsageWindow;

    use super::*;

    fn sample_usage() -> UsageSnapshot {
        let now = Utc::now();
        UsageSnapshot {
            five_hour: UsageWindow {
                utilization: 82.0,
                resets_at: now + Duration::hours(1),
            },
            seven_day: UsageWindow {
                utilization: 40.0,
                resets_at: now + Duration::days(3),
            },
        }
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(bar(0.0), "░".repeat(20));
        assert_eq!(bar(100.0), "█".repeat(20));
        assert_eq!(bar(50.0), format!("{}{}", "█".repeat(10), "░".repeat(10)));
    }

    #[test]
    fn bar_clamps_out_of_range_values() {
        assert_eq!(bar(250.0), "█".repeat(20));
        assert_eq!(bar(-5.0), "░".repeat(20));
    }

    #[test]
    fn pct_color_thresholds() {
        assert_eq!(pct_color(59.9), GREEN);
        assert_eq!(pct_color(60.0), YELLOW);
        assert_eq!(pct_color(80.0), RED);
    }

    #[test]
    fn json_output_shape() {
        let usage = sample_usage();
        let (five, seven) = projections(&usage);
        let out = JsonOutput {
            usage: &usage,
            forecast: JsonForecast {
                five_hour: JsonProjection::from(&five),
                seven_day: JsonProjection::from(&seven),
            },
            cache: None,
        };

        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&out).unwrap()).unwrap();
        assert_eq!(value["usage"]["five_hour"]["utilization"], 82.0);
        // 82% with an hour left in the window projects past the limit
        assert_eq!(value["forecast"]["five_hour"]["status"], "over limit");
        assert!(value.get("cache").is_none());
    }

    #[test]
    fn json_output_reports_cache_hits() {
        let usage = sample_usage();
        let entry = CacheEntry {
            usage: usage.clone(),
            fetched_at: Utc::now(),
        };
        let (five, seven) = projections(&usage);
        let out = JsonOutput {
            usage: &usage,
            forecast: JsonForecast {
                five_hour: JsonProjection::from(&five),
                seven_day: JsonProjection::from(&seven),
            },
            cache: Some(JsonCacheInfo {
                hit: true,
                fetched_at: entry.fetched_at,
            }),
        };

        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&out).unwrap()).unwrap();
        assert_eq!(value["cache"]["hit"], true);
    }
}
