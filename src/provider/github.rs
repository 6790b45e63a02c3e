//! GitHub identity provider: the reference concrete [`Provider`] implementation.
//!
//! Validates tokens against the authenticated-user endpoint and enumerates
//! organizations via the paginated orgs-of-authenticated-user endpoint,
//! following `rel="next"` links until exhausted. Both calls share a
//! per-token TTL cache guarded by a read/write lock so concurrent reads do
//! not serialise.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::identity::{Identity, OrgUnit, OrgUnitKind};
use crate::provider::{Provider, ProviderError};

/// Canonical provider name used for registration, detection, and fully-qualified user keys.
pub const PROVIDER_NAME: &str = "github";

/// Cache TTL default: five minutes.
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Upstream request timeout default: ten seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// GitHub paginates at 100 items per page; this is the max allowed by the API.
const ORGS_PER_PAGE: u32 = 100;

/// A single per-token cache slot. `identity` and `orgs` are populated
/// independently by `validate` and `list_orgs`; `expires_at` is shared and
/// reset on every write, whichever lands last.
#[derive(Clone)]
struct CacheEntry {
    identity: Option<Identity>,
    orgs: Option<Vec<OrgUnit>>,
    expires_at: Instant,
}

struct TokenCache {
    entries: HashMap<String, CacheEntry>,
}

impl TokenCache {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

/// The reference concrete identity provider, backed by the GitHub REST API.
pub struct GitHubProvider {
    http_client: reqwest::Client,
    api_base: String,
    ttl: Duration,
    cache: Arc<RwLock<TokenCache>>,
}

impl GitHubProvider {
    /// Build a provider with the default TTL (5 minutes) and timeout (10 seconds).
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_config(
            "https://api.github.com".to_string(),
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Build a provider pointed at a custom API base URL (used in tests against a
    /// mock server) with explicit TTL and request timeout.
    pub fn with_config(
        api_base: String,
        ttl: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent("authz-sidecar")
            .build()
            .map_err(|e| ProviderError::Upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            api_base,
            ttl,
            cache: Arc::new(RwLock::new(TokenCache::new())),
        })
    }

    /// Drop every cached entry.
    pub async fn clear(&self) {
        self.cache.write().await.entries.clear();
    }

    /// Drop the cache entry for a single token, forcing the next lookup to refresh.
    pub async fn clear_token(&self, token: &str) {
        self.cache.write().await.entries.remove(token);
    }

    async fn cached_identity(&self, token: &str) -> Option<Identity> {
        let cache = self.cache.read().await;
        let entry = cache.entries.get(token)?;
        if Instant::now() < entry.expires_at {
            entry.identity.clone()
        } else {
            None
        }
    }

    async fn cached_orgs(&self, token: &str) -> Option<Vec<OrgUnit>> {
        let cache = self.cache.read().await;
        let entry = cache.entries.get(token)?;
        if Instant::now() < entry.expires_at {
            entry.orgs.clone()
        } else {
            None
        }
    }

    async fn store_identity(&self, token: &str, identity: Identity) {
        let mut cache = self.cache.write().await;
        let expires_at = Instant::now() + self.ttl;
        cache
            .entries
            .entry(token.to_string())
            .and_modify(|e| {
                e.identity = Some(identity.clone());
                e.expires_at = expires_at;
            })
            .or_insert(CacheEntry {
                identity: Some(identity),
                orgs: None,
                expires_at,
            });
    }

    async fn store_orgs(&self, token: &str, orgs: Vec<OrgUnit>) {
        let mut cache = self.cache.write().await;
        let expires_at = Instant::now() + self.ttl;
        cache
            .entries
            .entry(token.to_string())
            .and_modify(|e| {
                e.orgs = Some(orgs.clone());
                e.expires_at = expires_at;
            })
            .or_insert(CacheEntry {
                identity: None,
                orgs: Some(orgs),
                expires_at,
            });
    }

    fn translate_status(status: reqwest::StatusCode, endpoint: &str) -> ProviderError {
        match status {
            reqwest::StatusCode::UNAUTHORIZED => {
                ProviderError::InvalidToken("invalid or expired token".to_string())
            }
            reqwest::StatusCode::FORBIDDEN => {
                let required_scope = match endpoint {
                    "user" => "read:user",
                    "orgs" => "read:org",
                    _ => "read:user",
                };
                ProviderError::InsufficientScope(format!(
                    "token lacks required scope '{required_scope}' for the {endpoint} endpoint"
                ))
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
            other => ProviderError::Upstream(format!("unexpected status {other} from {endpoint}")),
        }
    }

    async fn fetch_identity(&self, token: &str) -> Result<Identity, ProviderError> {
        let url = format!("{}/user", self.api_base);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| ProviderError::Upstream(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::translate_status(response.status(), "user"));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Upstream(format!("failed to parse user response: {e}")))?;

        parse_identity(&body)
    }

    async fn fetch_orgs(&self, token: &str) -> Result<Vec<OrgUnit>, ProviderError> {
        let mut orgs = Vec::new();
        let mut url = Some(format!(
            "{}/user/orgs?per_page={}",
            self.api_base, ORGS_PER_PAGE
        ));

        while let Some(next_url) = url.take() {
            let response = self
                .http_client
                .get(&next_url)
                .bearer_auth(token)
                .header("Accept", "application/vnd.github+json")
                .send()
                .await
                .map_err(|e| ProviderError::Upstream(format!("request to {next_url} failed: {e}")))?;

            if !response.status().is_success() {
                return Err(Self::translate_status(response.status(), "orgs"));
            }

            let link_header = response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let body: Vec<serde_json::Value> = response.json().await.map_err(|e| {
                ProviderError::Upstream(format!("failed to parse orgs response: {e}"))
            })?;

            for org in &body {
                orgs.push(parse_org(org)?);
            }

            url = link_header.as_deref().and_then(parse_next_link);
        }

        Ok(orgs)
    }
}

/// Parse the `rel="next"` target out of a GitHub `Link` response header.
fn parse_next_link(header: &str) -> Option<String> {
    for part in header.split(',') {
        let mut segments = part.split(';');
        let url_segment = segments.next()?.trim();
        let is_next = segments.any(|s| s.trim() == "rel=\"next\"");
        if is_next {
            let url = url_segment.trim_start_matches('<').trim_end_matches('>');
            return Some(url.to_string());
        }
    }
    None
}

fn parse_identity(body: &serde_json::Value) -> Result<Identity, ProviderError> {
    let user_id = body
        .get("id")
        .and_then(|v| v.as_i64())
        .map(|id| id.to_string())
        .ok_or_else(|| ProviderError::Upstream("user response missing 'id'".to_string()))?;

    let username = body
        .get("login")
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| ProviderError::Upstream("user response missing 'login'".to_string()))?;

    let email = body
        .get("email")
        .and_then(|v| v.as_str())
        .map(String::from);

    let mut attributes = HashMap::new();
    if let Some(name) = body.get("name").and_then(|v| v.as_str()) {
        attributes.insert("display_name".to_string(), name.to_string());
    }
    if let Some(avatar) = body.get("avatar_url").and_then(|v| v.as_str()) {
        attributes.insert("avatar_url".to_string(), avatar.to_string());
    }
    if let Some(profile) = body.get("html_url").and_then(|v| v.as_str()) {
        attributes.insert("profile_url".to_string(), profile.to_string());
    }

    Ok(Identity {
        provider: PROVIDER_NAME.to_string(),
        user_id,
        username,
        email,
        attributes,
    })
}

fn parse_org(body: &serde_json::Value) -> Result<OrgUnit, ProviderError> {
    let id = body
        .get("id")
        .and_then(|v| v.as_i64())
        .map(|id| id.to_string())
        .ok_or_else(|| ProviderError::Upstream("org entry missing 'id'".to_string()))?;

    let name = body
        .get("login")
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| ProviderError::Upstream("org entry missing 'login'".to_string()))?;

    Ok(OrgUnit {
        id,
        name,
        kind: OrgUnitKind::GitHubOrg,
    })
}

#[async_trait]
impl Provider for GitHubProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn validate(&self, token: &str) -> Result<Identity, ProviderError> {
        if let Some(identity) = self.cached_identity(token).await {
            return Ok(identity);
        }

        let identity = self.fetch_identity(token).await?;
        self.store_identity(token, identity.clone()).await;
        Ok(identity)
    }

    async fn list_orgs(&self, token: &str) -> Result<Vec<OrgUnit>, ProviderError> {
        if let Some(orgs) = self.cached_orgs(token).await {
            return Ok(orgs);
        }

        let orgs = self.fetch_orgs(token).await?;
        self.store_orgs(token, orgs.clone()).await;
        Ok(orgs)
    }
}
