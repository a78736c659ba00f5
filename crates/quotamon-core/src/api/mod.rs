//! Usage endpoint client and credential discovery.

mod client;
mod credentials;
mod types;

pub use client::UsageClient;
pub use credentials::{read_credentials, read_credentials_file};
pub use types::{OAuthCredentials, OAuthTokenData, UsageSnapshot, UsageWindow};
