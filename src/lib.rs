//! authz-sidecar - External authorization sidecar for a directory API
//!
//! Validates bearer tokens against a pluggable identity provider, resolves
//! the caller's role-based permissions, and renders an allow/deny decision
//! for an API gateway's Check call.

pub mod cli;
pub mod config;
pub mod detect;
pub mod handler;
pub mod identity;
pub mod observability;
pub mod policy;
pub mod provider;
pub mod response;
pub mod server;

pub use config::Config;

/// Result type alias for authz-sidecar operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("server error: {0}")]
    Server(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
