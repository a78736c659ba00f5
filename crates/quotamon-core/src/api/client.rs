//! Blocking client for the usage endpoint.
//!
//! Calls block for up to the fetch timeout; the scheduler runs them on a
//! dedicated blocking task and only the result crosses back into the loop.

use std::time::Duration;

use ureq::Agent;

use super::types::UsageSnapshot;
use crate::error::FetchError;

const USAGE_URL: &str = "https://api.anthropic.com/api/oauth/usage";

/// Opt-in header required by the OAuth usage endpoint.
const OAUTH_BETA_HEADER: &str = "oauth-2025-04-20";

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for fetching usage snapshots with a bearer token.
#[derive(Debug, Clone)]
pub struct UsageClient {
    agent: Agent,
    url: String,
}

impl UsageClient {
    /// Client against the production endpoint.
    pub fn new() -> Self {
        Self::with_url(USAGE_URL)
    }

    /// Client against an arbitrary endpoint (tests).
    pub fn with_url(url: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(FETCH_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            url: url.into(),
        }
    }

    /// Fetch the current usage snapshot. Non-success statuses are fetch
    /// errors, never panics.
    pub fn fetch_usage(&self, access_token: &str) -> Result<UsageSnapshot, FetchError> {
        let mut response = self
            .agent
            .get(&self.url)
            .header("Authorization", format!("Bearer {access_token}"))
            .header("anthropic-beta", OAUTH_BETA_HEADER)
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => FetchError::Status(code),
                other => FetchError::Transport(other),
            })?;

        response
            .body_mut()
            .read_json::<UsageSnapshot>()
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}

impl Default for UsageClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        // Port 1 on loopback refuses the connection without touching any
        // real service.
        let client = UsageClient::with_url("http://127.0.0.1:1/usage");
        let err = client.fetch_usage("tok").unwrap_err();
        assert!(matches!(
            err,
            FetchError::Transport(_) | FetchError::Status(_)
        ));
    }
}
