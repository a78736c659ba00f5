//! Error taxonomy for the core crate.
//!
//! Credential problems surface to the user and are never retried within a
//! tick; fetch and update-check failures are transient and retried on the
//! next scheduled attempt; cache read failures degrade to a miss.

use thiserror::Error;

/// Failure to discover or use the local Claude Code login.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credential source yielded a token
    #[error("no Claude Code credentials found; log in with `claude /login`")]
    NotFound,

    /// The stored OAuth token is past its expiry
    #[error("OAuth token expired; open Claude Code to reauthenticate")]
    Expired,

    /// A credential payload existed but could not be used
    #[error("credentials are malformed: {0}")]
    Malformed(String),

    /// Reading a credential store failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure to fetch a usage snapshot. All variants are transient.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response
    #[error("usage request failed: {0}")]
    Transport(ureq::Error),

    /// The endpoint answered with a non-success status
    #[error("usage endpoint returned HTTP {0}")]
    Status(u16),

    /// The response body did not match the expected shape
    #[error("could not decode usage response: {0}")]
    Decode(String),

    /// The fetch task was torn down before completing
    #[error("usage fetch interrupted: {0}")]
    Interrupted(String),
}

/// Failure to read or write the usage cache. Reads that fail with
/// `NotFound` or `Corrupt` are treated as a miss by every caller.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No cache file exists yet
    #[error("no cached usage")]
    NotFound,

    /// The cache file exists but does not parse
    #[error("cached usage is corrupt: {0}")]
    Corrupt(String),

    /// Filesystem access failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure in the self-update protocol. `Check` is silent and retried on
/// the next interval; the apply-side variants leave the running binary
/// untouched and are surfaced to the user.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The release feed was unreachable or unusable
    #[error("update check failed: {0}")]
    Check(String),

    /// The release binary could not be downloaded
    #[error("download failed: {0}")]
    Download(String),

    /// The downloaded binary failed its smoke test and was never installed
    #[error("downloaded binary failed verification: {0}")]
    Verify(String),

    /// Swapping the verified binary over the running executable failed
    #[error("could not replace executable: {0}")]
    Replace(#[source] std::io::Error),

    /// The updated binary is installed but a new process did not start
    #[error("could not restart: {0}")]
    Restart(#[source] std::io::Error),

    /// Staging-area filesystem access failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
