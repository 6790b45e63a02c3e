//! Request orchestration: the Check call (§4.5).
//!
//! Glues provider detection, identity validation, org enumeration and the
//! policy engine into a single decision. No transport concerns live here --
//! [`crate::server`] adapts this to HTTP.

use std::collections::HashMap;

use crate::config::Config;
use crate::detect::detect_provider;
use crate::policy::{Decision, PolicyEngine};
use crate::provider::Registry;

/// A Check call, transport-agnostic: headers are already lower-cased keys.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub headers: HashMap<String, String>,
    /// The fully-qualified RPC method being authorized, e.g. `/store.StoreService/Push`.
    pub method: String,
}

/// The outcome of a Check call.
#[derive(Debug, Clone)]
pub enum CheckResponse {
    Allow(AllowContext),
    Deny(DenyReason),
}

/// Identity facts the response builder turns into forwarded headers.
#[derive(Debug, Clone)]
pub struct AllowContext {
    pub provider: String,
    pub user_id: String,
    pub username: String,
    pub email: Option<String>,
    pub org_names: Vec<String>,
}

/// Why a Check call was denied, and the status code family it maps to.
#[derive(Debug, Clone)]
pub struct DenyReason {
    pub code: DenyCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyCode {
    /// No usable bearer token was presented.
    Unauthenticated,
    /// A token was presented but didn't resolve to an allowed request.
    PermissionDenied,
    /// The detected provider isn't registered.
    Unavailable,
}

const AUTH_HEADER: &str = "authorization";
const BEARER_SCHEME: &str = "bearer";

/// Extract the bearer token from the `Authorization` header (§4.5 steps 2-3),
/// accepting the scheme case-insensitively. The error string is the exact
/// deny reason surfaced to the caller.
fn extract_bearer_token(headers: &HashMap<String, String>) -> Result<String, String> {
    let raw = headers
        .get(AUTH_HEADER)
        .ok_or_else(|| "missing Authorization header".to_string())?;

    let Some((scheme, rest)) = raw.split_once(char::is_whitespace) else {
        return Err("invalid Authorization header format".to_string());
    };

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(format!("expected Bearer token, got {scheme}"));
    }

    let token = rest.trim();
    if token.is_empty() {
        Err("empty token".to_string())
    } else {
        Ok(token.to_string())
    }
}

/// Carries the dependencies a single Check call needs: the provider
/// registry, the loaded config (for detection), and the flattened policy
/// engine. Built once at startup and shared across requests.
pub struct Handler {
    registry: Registry,
    config: Config,
    policy: PolicyEngine,
}

impl Handler {
    pub fn new(registry: Registry, config: Config) -> Self {
        let policy = PolicyEngine::new(&config);
        Self {
            registry,
            config,
            policy,
        }
    }

    pub async fn check(&self, request: &CheckRequest) -> CheckResponse {
        let token = match extract_bearer_token(&request.headers) {
            Ok(token) => token,
            Err(message) => {
                return CheckResponse::Deny(DenyReason {
                    code: DenyCode::Unauthenticated,
                    message,
                });
            }
        };

        let provider_name = detect_provider(&request.headers, &token, &self.config);

        let provider = match self.registry.get(&provider_name) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!(provider = %provider_name, "provider unavailable");
                return CheckResponse::Deny(DenyReason {
                    code: DenyCode::Unavailable,
                    message: e.to_string(),
                });
            }
        };

        let identity = match provider.validate(&token).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(provider = %provider_name, error = %e, "token validation failed");
                return CheckResponse::Deny(DenyReason {
                    code: DenyCode::Unauthenticated,
                    message: format!("invalid token: {}", e.message()),
                });
            }
        };

        let org_units = match provider.list_orgs(&token).await {
            Ok(orgs) => orgs,
            Err(e) => {
                tracing::warn!(
                    provider = %provider_name,
                    user = %identity.username,
                    error = %e,
                    "org enumeration failed, continuing with no org bindings"
                );
                Vec::new()
            }
        };

        let user_key = identity.user_key();
        let org_names: Vec<String> = org_units.iter().map(|org| org.name.clone()).collect();

        let decision = self.policy.authorize(
            &identity.username,
            &user_key,
            &org_names,
            &request.method,
        );

        match decision {
            Decision::Allow => {
                tracing::info!(
                    provider = %provider_name,
                    user = %identity.username,
                    org_constructs = %org_names.join(","),
                    method = %request.method,
                    decision = "allow",
                    "check allowed"
                );
                CheckResponse::Allow(AllowContext {
                    provider: identity.provider,
                    user_id: identity.user_id,
                    username: identity.username,
                    email: identity.email,
                    org_names,
                })
            }
            Decision::Deny(reason) => {
                tracing::info!(
                    provider = %provider_name,
                    user = %identity.username,
                    org_constructs = %org_names.join(","),
                    method = %request.method,
                    decision = "deny",
                    reason = %reason,
                    "check denied"
                );
                CheckResponse::Deny(DenyReason {
                    code: DenyCode::PermissionDenied,
                    message: reason,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_auth(value: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(AUTH_HEADER.to_string(), value.to_string());
        headers
    }

    #[test]
    fn extracts_token_from_standard_bearer_header() {
        let headers = headers_with_auth("Bearer abc123");
        assert_eq!(extract_bearer_token(&headers), Ok("abc123".to_string()));
    }

    #[test]
    fn accepts_lowercase_scheme() {
        let headers = headers_with_auth("bearer abc123");
        assert_eq!(extract_bearer_token(&headers), Ok("abc123".to_string()));
    }

    #[test]
    fn rejects_missing_header() {
        let headers = HashMap::new();
        assert_eq!(
            extract_bearer_token(&headers),
            Err("missing Authorization header".to_string())
        );
    }

    #[test]
    fn rejects_non_bearer_scheme_naming_the_scheme_seen() {
        let headers = headers_with_auth("Token abc");
        assert_eq!(
            extract_bearer_token(&headers),
            Err("expected Bearer token, got Token".to_string())
        );
    }

    #[test]
    fn rejects_whitespace_only_token() {
        let headers = headers_with_auth("Bearer    ");
        assert_eq!(extract_bearer_token(&headers), Err("empty token".to_string()));
    }

    #[test]
    fn rejects_empty_token() {
        let headers = headers_with_auth("Bearer ");
        assert_eq!(extract_bearer_token(&headers), Err("empty token".to_string()));
    }

    #[test]
    fn rejects_header_with_no_scheme_separator() {
        let headers = headers_with_auth("opaquetoken");
        assert_eq!(
            extract_bearer_token(&headers),
            Err("invalid Authorization header format".to_string())
        );
    }
}
