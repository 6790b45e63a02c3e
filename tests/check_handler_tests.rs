//! End-to-end Check call scenarios, driving the full handler stack
//! (detection, validation, org enumeration, policy) against a mocked
//! GitHub API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authz_sidecar::config::{Config, RoleConfig};
use authz_sidecar::handler::{CheckRequest, CheckResponse, DenyCode, Handler};
use authz_sidecar::provider::{GitHubProvider, Registry};

async fn mock_github_user(mock_server: &MockServer, login: &str, id: i64) {
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": id,
                "login": login,
            })),
        )
        .mount(mock_server)
        .await;
}

async fn mock_github_orgs(mock_server: &MockServer, orgs: &[&str]) {
    let body: Vec<serde_json::Value> = orgs
        .iter()
        .enumerate()
        .map(|(i, name)| serde_json::json!({"id": i, "login": name}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(mock_server)
        .await;
}

fn headers_with_bearer(token: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("authorization".to_string(), format!("Bearer {token}"));
    headers
}

fn build_handler(mock_server: &MockServer, config: Config) -> Handler {
    let provider = GitHubProvider::with_config(
        mock_server.uri(),
        Duration::from_secs(300),
        Duration::from_secs(5),
    )
    .unwrap();

    let mut registry = Registry::new();
    registry.register(Arc::new(provider));
    Handler::new(registry, config)
}

fn config_with_role(role_name: &str, role: RoleConfig) -> Config {
    let mut config = Config::default();
    config.roles.insert(role_name.to_string(), role);
    config
}

// Scenario: admin user via direct binding is allowed any method.
#[tokio::test]
async fn admin_via_direct_binding_is_allowed() {
    let mock_server = MockServer::start().await;
    mock_github_user(&mock_server, "alice", 1).await;
    mock_github_orgs(&mock_server, &[]).await;

    let config = config_with_role(
        "admin",
        RoleConfig {
            allowed_methods: vec!["*".to_string()],
            users: vec!["github:alice".to_string()],
            orgs: vec![],
        },
    );
    let handler = build_handler(&mock_server, config);

    let request = CheckRequest {
        headers: headers_with_bearer("gho_alicetoken"),
        method: "/store.StoreService/Push".to_string(),
    };

    match handler.check(&request).await {
        CheckResponse::Allow(context) => {
            assert_eq!(context.username, "alice");
            assert_eq!(context.provider, "github");
        }
        CheckResponse::Deny(reason) => panic!("expected allow, got deny: {reason:?}"),
    }
}

// Scenario: a reader is denied a write method outside its allowed pattern.
#[tokio::test]
async fn reader_is_denied_a_write_method() {
    let mock_server = MockServer::start().await;
    mock_github_user(&mock_server, "bob", 2).await;
    mock_github_orgs(&mock_server, &[]).await;

    let config = config_with_role(
        "reader",
        RoleConfig {
            allowed_methods: vec!["/store.StoreService/Pull".to_string()],
            users: vec!["github:bob".to_string()],
            orgs: vec![],
        },
    );
    let handler = build_handler(&mock_server, config);

    let request = CheckRequest {
        headers: headers_with_bearer("gho_bobtoken"),
        method: "/store.StoreService/Push".to_string(),
    };

    match handler.check(&request).await {
        CheckResponse::Deny(reason) => assert_eq!(reason.code, DenyCode::PermissionDenied),
        CheckResponse::Allow(_) => panic!("expected deny"),
    }
}

// Scenario: org binding with a wildcard method grants access.
#[tokio::test]
async fn org_binding_with_wildcard_grants_access() {
    let mock_server = MockServer::start().await;
    mock_github_user(&mock_server, "charlie", 3).await;
    mock_github_orgs(&mock_server, &["agntcy"]).await;

    let config = config_with_role(
        "admin",
        RoleConfig {
            allowed_methods: vec!["*".to_string()],
            users: vec![],
            orgs: vec!["agntcy".to_string()],
        },
    );
    let handler = build_handler(&mock_server, config);

    let request = CheckRequest {
        headers: headers_with_bearer("gho_charlietoken"),
        method: "/store.StoreService/Push".to_string(),
    };

    assert!(matches!(
        handler.check(&request).await,
        CheckResponse::Allow(_)
    ));
}

// Scenario: deny list overrides an otherwise-admin direct binding.
#[tokio::test]
async fn deny_list_beats_admin_binding() {
    let mock_server = MockServer::start().await;
    mock_github_user(&mock_server, "alice", 1).await;
    mock_github_orgs(&mock_server, &[]).await;

    let mut config = config_with_role(
        "admin",
        RoleConfig {
            allowed_methods: vec!["*".to_string()],
            users: vec!["github:alice".to_string()],
            orgs: vec![],
        },
    );
    config.user_deny_list = vec!["github:alice".to_string()];
    let handler = build_handler(&mock_server, config);

    let request = CheckRequest {
        headers: headers_with_bearer("gho_alicetoken"),
        method: "/store.StoreService/Push".to_string(),
    };

    match handler.check(&request).await {
        CheckResponse::Deny(reason) => assert!(reason.message.contains("deny list")),
        CheckResponse::Allow(_) => panic!("expected deny"),
    }
}

// Scenario: a user with no binding falls through to the default role.
#[tokio::test]
async fn default_role_allows_an_unbound_user() {
    let mock_server = MockServer::start().await;
    mock_github_user(&mock_server, "eve", 5).await;
    mock_github_orgs(&mock_server, &[]).await;

    let mut config = config_with_role(
        "reader",
        RoleConfig {
            allowed_methods: vec!["/store.StoreService/Pull".to_string()],
            users: vec![],
            orgs: vec![],
        },
    );
    config.default_role = "reader".to_string();
    let handler = build_handler(&mock_server, config);

    let request = CheckRequest {
        headers: headers_with_bearer("gho_evetoken"),
        method: "/store.StoreService/Pull".to_string(),
    };

    assert!(matches!(
        handler.check(&request).await,
        CheckResponse::Allow(_)
    ));
}

// Scenario: a malformed bearer header is rejected before any upstream call.
#[tokio::test]
async fn malformed_bearer_header_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = Config::default();
    let handler = build_handler(&mock_server, config);

    let mut headers = HashMap::new();
    headers.insert("authorization".to_string(), "NotBearer xyz".to_string());

    let request = CheckRequest {
        headers,
        method: "/store.StoreService/Pull".to_string(),
    };

    match handler.check(&request).await {
        CheckResponse::Deny(reason) => assert_eq!(reason.code, DenyCode::Unauthenticated),
        CheckResponse::Allow(_) => panic!("expected deny"),
    }
}

// Scenario 6: wrong scheme names the scheme that was actually sent.
#[tokio::test]
async fn wrong_scheme_message_names_the_scheme_seen() {
    let mock_server = MockServer::start().await;
    let config = Config::default();
    let handler = build_handler(&mock_server, config);

    let mut headers = HashMap::new();
    headers.insert("authorization".to_string(), "Token abc".to_string());

    let request = CheckRequest {
        headers,
        method: "/store.StoreService/Pull".to_string(),
    };

    match handler.check(&request).await {
        CheckResponse::Deny(reason) => {
            assert_eq!(reason.code, DenyCode::Unauthenticated);
            assert_eq!(reason.message, "expected Bearer token, got Token");
        }
        CheckResponse::Allow(_) => panic!("expected deny"),
    }
}

// Explicit provider override naming an unregistered provider denies Unavailable.
#[tokio::test]
async fn unknown_explicit_provider_is_unavailable() {
    let mock_server = MockServer::start().await;
    let config = Config::default();
    let handler = build_handler(&mock_server, config);

    let mut headers = headers_with_bearer("gho_sometoken");
    headers.insert("x-auth-provider".to_string(), "azure".to_string());

    let request = CheckRequest {
        headers,
        method: "/store.StoreService/Pull".to_string(),
    };

    match handler.check(&request).await {
        CheckResponse::Deny(reason) => assert_eq!(reason.code, DenyCode::Unavailable),
        CheckResponse::Allow(_) => panic!("expected deny"),
    }
}

#[tokio::test]
async fn org_enumeration_failure_is_lenient_and_falls_back_to_default_role() {
    let mock_server = MockServer::start().await;
    mock_github_user(&mock_server, "frank", 6).await;
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let mut config = config_with_role(
        "reader",
        RoleConfig {
            allowed_methods: vec!["/store.StoreService/Pull".to_string()],
            users: vec![],
            orgs: vec![],
        },
    );
    config.default_role = "reader".to_string();
    let handler = build_handler(&mock_server, config);

    let request = CheckRequest {
        headers: headers_with_bearer("gho_franktoken"),
        method: "/store.StoreService/Pull".to_string(),
    };

    assert!(matches!(
        handler.check(&request).await,
        CheckResponse::Allow(_)
    ));
}

#[tokio::test]
async fn invalid_token_is_rejected_as_unauthenticated() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let config = Config::default();
    let handler = build_handler(&mock_server, config);

    let request = CheckRequest {
        headers: headers_with_bearer("gho_badtoken"),
        method: "/store.StoreService/Pull".to_string(),
    };

    match handler.check(&request).await {
        CheckResponse::Deny(reason) => {
            assert_eq!(reason.code, DenyCode::Unauthenticated);
            assert_eq!(reason.message, "invalid token: invalid or expired token");
        }
        CheckResponse::Allow(_) => panic!("expected deny"),
    }
}
