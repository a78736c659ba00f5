//! Wire types for the usage endpoint and the local OAuth credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single rate-limit window as reported by the usage endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    /// Utilization percentage (nominally 0-100, may exceed 100 over limit)
    pub utilization: f64,
    /// When this window resets
    pub resets_at: DateTime<Utc>,
}

/// Point-in-time usage across both rate-limit windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Rolling five-hour window
    pub five_hour: UsageWindow,
    /// Rolling seven-day window
    pub seven_day: UsageWindow,
}

impl UsageSnapshot {
    /// The worse (max) utilization of the two windows.
    pub fn worst_utilization(&self) -> f64 {
        self.five_hour.utilization.max(self.seven_day.utilization)
    }
}

/// OAuth credentials as stored by Claude Code.
///
/// `~/.claude/.credentials.json` nests everything under `claudeAiOauth`.
/// The env var and raw keychain values carry only a bare access token;
/// those have no expiry metadata and never report expired.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthCredentials {
    /// Nested OAuth payload from the credentials file
    #[serde(rename = "claudeAiOauth", default)]
    pub claude_ai_oauth: OAuthTokenData,

    /// Set when the token came from the env var or a raw keychain value
    #[serde(skip)]
    token_only: Option<String>,
}

/// The `claudeAiOauth` object inside the credentials file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthTokenData {
    /// OAuth access token
    #[serde(rename = "accessToken", default)]
    pub access_token: String,

    /// Refresh token (present on disk but not usable for refresh)
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: String,

    /// Expiry as unix milliseconds
    #[serde(rename = "expiresAt", default)]
    pub expires_at: i64,

    /// Granted OAuth scopes
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Subscription type (e.g. "max")
    #[serde(rename = "subscriptionType", default)]
    pub subscription_type: String,

    /// Rate limit tier
    #[serde(rename = "rateLimitTier", default)]
    pub rate_limit_tier: String,
}

impl OAuthCredentials {
    /// Wrap a bare access token from the env var or keychain.
    pub fn from_raw_token(token: impl Into<String>) -> Self {
        Self {
            token_only: Some(token.into()),
            ..Self::default()
        }
    }

    /// The access token to present as a bearer credential.
    pub fn access_token(&self) -> &str {
        match &self.token_only {
            Some(token) => token,
            None => &self.claude_ai_oauth.access_token,
        }
    }

    /// Whether the token is past its expiry. Raw tokens carry no expiry
    /// and always pass.
    pub fn is_expired(&self) -> bool {
        if self.token_only.is_some() {
            return false;
        }
        Utc::now().timestamp_millis() >= self.claude_ai_oauth.expires_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn snapshot_round_trips_through_json() {
        let json = r#"{
            "five_hour": {"utilization": 42.5, "resets_at": "2026-08-07T12:30:00Z"},
            "seven_day": {"utilization": 61.0, "resets_at": "2026-08-10T00:00:00Z"}
        }"#;

        let snapshot: UsageSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.five_hour.utilization, 42.5);
        assert_eq!(
            snapshot.five_hour.resets_at,
            Utc.with_ymd_and_hms(2026, 8, 7, 12, 30, 0).unwrap()
        );
        assert_eq!(snapshot.worst_utilization(), 61.0);

        let back: UsageSnapshot =
            serde_json::from_str(&serde_json::to_string(&snapshot).unwrap()).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn credentials_file_shape_parses() {
        let json = r#"{
            "claudeAiOauth": {
                "accessToken": "tok-123",
                "refreshToken": "ref-456",
                "expiresAt": 1705320000000,
                "scopes": ["user:inference"],
                "subscriptionType": "max",
                "rateLimitTier": "max_20x"
            }
        }"#;

        let creds: OAuthCredentials = serde_json::from_str(json).unwrap();
        assert_eq!(creds.access_token(), "tok-123");
        assert_eq!(creds.claude_ai_oauth.subscription_type, "max");
        // expiresAt is in 2024, long past
        assert!(creds.is_expired());
    }

    #[test]
    fn missing_oauth_object_defaults_to_empty_token() {
        let creds: OAuthCredentials = serde_json::from_str("{}").unwrap();
        assert_eq!(creds.access_token(), "");
    }

    #[test]
    fn raw_token_never_expires() {
        let creds = OAuthCredentials::from_raw_token("tok-raw");
        assert_eq!(creds.access_token(), "tok-raw");
        assert!(!creds.is_expired());
    }
}
