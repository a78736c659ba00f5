//! Credential discovery for the local Claude Code login.
//!
//! Sources are tried in order:
//! 1. `CLAUDE_CODE_OAUTH_TOKEN` env var (raw access token)
//! 2. macOS Keychain (`security find-generic-password`)
//! 3. `~/.claude/.credentials.json`

use std::path::{Path, PathBuf};

use super::types::OAuthCredentials;
use crate::error::CredentialError;

/// Env var holding a bare access token, bypassing the stores.
const TOKEN_ENV_VAR: &str = "CLAUDE_CODE_OAUTH_TOKEN";

/// Read credentials from the first available source.
pub fn read_credentials() -> Result<OAuthCredentials, CredentialError> {
    if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
        if !token.is_empty() {
            return Ok(OAuthCredentials::from_raw_token(token));
        }
    }

    #[cfg(target_os = "macos")]
    if let Ok(creds) = read_keychain() {
        return Ok(creds);
    }

    let path = default_credentials_path().ok_or(CredentialError::NotFound)?;
    read_credentials_file(&path)
}

fn default_credentials_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join(".credentials.json"))
}

/// Keychain items hold either the credentials JSON or a raw token.
#[cfg(target_os = "macos")]
fn read_keychain() -> Result<OAuthCredentials, CredentialError> {
    use std::process::Command;

    let output = Command::new("security")
        .args(["find-generic-password", "-s", "Claude Code-credentials", "-w"])
        .output()?;
    if !output.status.success() {
        return Err(CredentialError::NotFound);
    }

    let data = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if data.is_empty() {
        return Err(CredentialError::NotFound);
    }

    Ok(serde_json::from_str(&data)
        .unwrap_or_else(|_| OAuthCredentials::from_raw_token(data)))
}

/// Read and parse a credentials file. A missing file is `NotFound`; a file
/// that parses but yields no access token is `Malformed`.
pub fn read_credentials_file(path: &Path) -> Result<OAuthCredentials, CredentialError> {
    let data = std::fs::read_to_string(path).map_err(|_| CredentialError::NotFound)?;

    let creds: OAuthCredentials =
        serde_json::from_str(&data).map_err(|e| CredentialError::Malformed(e.to_string()))?;
    if creds.access_token().is_empty() {
        return Err(CredentialError::Malformed("empty access token".to_string()));
    }

    Ok(creds)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_credentials(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(".credentials.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn env_var_takes_priority() {
        temp_env::with_var(TOKEN_ENV_VAR, Some("tok-from-env"), || {
            let creds = read_credentials().unwrap();
            assert_eq!(creds.access_token(), "tok-from-env");
            assert!(!creds.is_expired());
        });
    }

    #[test]
    fn empty_env_var_is_ignored() {
        // An empty env value must not short-circuit discovery into a
        // useless raw token.
        temp_env::with_var(TOKEN_ENV_VAR, Some(""), || {
            if let Ok(creds) = read_credentials() {
                assert!(!creds.access_token().is_empty());
            }
        });
    }

    #[test]
    fn file_with_token_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_credentials(
            dir.path(),
            r#"{"claudeAiOauth": {"accessToken": "tok-file", "expiresAt": 9999999999999}}"#,
        );

        let creds = read_credentials_file(&path).unwrap();
        assert_eq!(creds.access_token(), "tok-file");
        assert!(!creds.is_expired());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_credentials_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CredentialError::NotFound));
    }

    #[test]
    fn unparseable_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_credentials(dir.path(), "not json at all");
        let err = read_credentials_file(&path).unwrap_err();
        assert!(matches!(err, CredentialError::Malformed(_)));
    }

    #[test]
    fn empty_token_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_credentials(dir.path(), r#"{"claudeAiOauth": {"accessToken": ""}}"#);
        let err = read_credentials_file(&path).unwrap_err();
        assert!(matches!(err, CredentialError::Malformed(_)));
    }
}
