//! Identity provider abstraction and registry.
//!
//! A provider validates an opaque bearer token against an upstream identity
//! system and enumerates the organizational units the resulting user belongs
//! to. [`GitHubProvider`] is the reference concrete implementation; adding a
//! provider means adding a new type implementing [`Provider`], not
//! subclassing a base.

pub mod github;

pub use github::GitHubProvider;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::identity::{Identity, OrgUnit};

/// Error surfaced by a provider's `validate`/`list_orgs` calls.
#[derive(Debug, thiserror::Error, Clone)]
pub enum ProviderError {
    #[error("invalid or expired token")]
    InvalidToken(String),

    #[error("insufficient scope: {0}")]
    InsufficientScope(String),

    #[error("rate limited by upstream identity provider")]
    RateLimited,

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl ProviderError {
    /// Human-readable message suitable for embedding in a deny reason.
    pub fn message(&self) -> String {
        match self {
            ProviderError::InvalidToken(msg) => msg.clone(),
            ProviderError::InsufficientScope(msg) => msg.clone(),
            ProviderError::RateLimited => "rate limited".to_string(),
            ProviderError::Upstream(msg) => msg.clone(),
        }
    }
}

/// The provider capability contract: `{name, validate, list_orgs}`.
///
/// No other operations are required or invoked by the core.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Canonical identifier used to register and look up this provider.
    fn name(&self) -> &str;

    /// Validate a bearer token and return the canonical identity it names.
    async fn validate(&self, token: &str) -> Result<Identity, ProviderError>;

    /// Enumerate the organizational units the token's identity belongs to.
    ///
    /// An empty sequence is a valid success (the user belongs to no OUs).
    async fn list_orgs(&self, token: &str) -> Result<Vec<OrgUnit>, ProviderError>;
}

/// Name-keyed registry of configured providers, populated once at startup.
pub struct Registry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

/// Lookup by an unregistered name.
#[derive(Debug, thiserror::Error, Clone)]
#[error("provider '{0}' is not configured")]
pub struct Unavailable(pub String);

impl Registry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider under its own [`Provider::name`].
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, Unavailable> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| Unavailable(name.to_string()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
