//! Role-based policy engine: the authorization decision core (§4.4).
//!
//! Roles are flattened at construction into three tables -- permissions,
//! user groupings, and org groupings -- mirroring how a Casbin-style RBAC
//! enforcer is loaded: policies are `(subject, resource, action)` triples
//! and groupings are `(subject, role)` edges, kept in two independent
//! namespaces so a username can never collide with an org of the same
//! spelling.

use std::collections::{HashMap, HashSet};

use crate::config::Config;

/// Authorization outcome. A deny always carries the reason the last branch
/// refused, so the caller can build a `PermissionDenied` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

/// Error from a single policy table lookup. The tables built by this engine
/// can never actually fail -- there's no external enforcer round-trip -- but
/// the query surface mirrors one (e.g. a Casbin `Enforcer::enforce` call)
/// that could, so a future backing store can slot in without reshaping the
/// call sites in `authorize`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("authorization check failed: {0}")]
pub struct EnforceError(pub String);

/// The "access" action is the only one the core ever checks; it exists as a
/// named constant to keep the `(subject, resource, action)` triple legible
/// at call sites instead of a bare string literal.
const ACTION_ACCESS: &str = "access";

fn role_subject(role_name: &str) -> String {
    format!("role:{role_name}")
}

fn org_subject(org_name: &str) -> String {
    format!("org:{org_name}")
}

/// Loaded, immutable policy tables. Construction flattens every configured
/// role; queries afterwards are pure functions over the tables.
pub struct PolicyEngine {
    /// subject -> method patterns it is granted `access` to.
    permissions: HashMap<String, Vec<String>>,
    /// fully-qualified user key (lower-cased) -> roles bound to that user.
    user_roles: HashMap<String, Vec<String>>,
    /// org name (lower-cased) -> roles bound to that org.
    org_roles: HashMap<String, Vec<String>>,
    /// deny list entries (lower-cased), either bare usernames or fully-qualified keys.
    deny_list: HashSet<String>,
    default_role: Option<String>,
    default_provider: String,
}

impl PolicyEngine {
    /// Flatten `config` into policy tables. Never fails -- config-level
    /// validation (e.g. `default_role` resolving to a real role) already
    /// happened in [`Config::validate`](crate::config::Config::validate).
    pub fn new(config: &Config) -> Self {
        let mut permissions: HashMap<String, Vec<String>> = HashMap::new();
        let mut user_roles: HashMap<String, Vec<String>> = HashMap::new();
        let mut org_roles: HashMap<String, Vec<String>> = HashMap::new();

        for (role_name, role) in &config.roles {
            let subject = role_subject(role_name);
            permissions
                .entry(subject.clone())
                .or_default()
                .extend(role.allowed_methods.iter().cloned());

            for user in &role.users {
                let key = normalise_user_key(user, &config.default_provider).to_lowercase();
                user_roles.entry(key).or_default().push(subject.clone());
            }

            for org in &role.orgs {
                org_roles
                    .entry(org.to_lowercase())
                    .or_default()
                    .push(subject.clone());
            }
        }

        let deny_list = config
            .user_deny_list
            .iter()
            .map(|entry| entry.to_lowercase())
            .collect();

        let default_role = if config.default_role.is_empty() {
            None
        } else {
            Some(config.default_role.clone())
        };

        Self {
            permissions,
            user_roles,
            org_roles,
            deny_list,
            default_role,
            default_provider: config.default_provider.clone(),
        }
    }

    /// Query whether `subject` is granted `access` to `resource` (a method
    /// pattern comparison, not a literal resource lookup).
    fn enforce(&self, subject: &str, resource: &str) -> Result<bool, EnforceError> {
        let Some(patterns) = self.permissions.get(subject) else {
            return Ok(false);
        };
        Ok(patterns.iter().any(|pattern| matches_method(pattern, resource)))
    }

    /// Run the full authorization algorithm (§4.4): deny list, direct user
    /// binding, org binding (in input order), then default role.
    pub fn authorize(
        &self,
        username: &str,
        user_key: &str,
        user_orgs: &[String],
        api_method: &str,
    ) -> Decision {
        let username_lc = username.to_lowercase();
        let user_key_lc = user_key.to_lowercase();

        if self.deny_list.contains(&username_lc) || self.deny_list.contains(&user_key_lc) {
            return Decision::Deny("user in deny list".to_string());
        }

        if let Some(roles) = self.user_roles.get(&user_key_lc) {
            for role in roles {
                match self.enforce(role, api_method) {
                    Ok(true) => return Decision::Allow,
                    Ok(false) => {}
                    Err(e) => return Decision::Deny(format!("authorization check failed: {e}")),
                }
            }
        }

        for org in user_orgs {
            let Some(roles) = self.org_roles.get(&org.to_lowercase()) else {
                continue;
            };
            for role in roles {
                match self.enforce(role, api_method) {
                    Ok(true) => return Decision::Allow,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(org = %org, error = %e, "org authorization check failed, continuing");
                    }
                }
            }
        }

        if let Some(default_role) = &self.default_role {
            let subject = role_subject(default_role);
            match self.enforce(&subject, api_method) {
                Ok(true) => return Decision::Allow,
                Ok(false) => {}
                Err(e) => return Decision::Deny(format!("authorization check failed: {e}")),
            }
        }

        Decision::Deny("no assigned role".to_string())
    }

    /// Normalise a bare username (or already-qualified key) using this
    /// engine's default provider. Exposed so the request handler can build
    /// `user_key` consistently with how roles were bound.
    pub fn normalise_user_key(&self, user: &str) -> String {
        normalise_user_key(user, &self.default_provider)
    }
}

/// Normalise a user reference to a fully-qualified `"<provider>:<username>"`
/// key, treating a username with no `:` as belonging to `default_provider`.
fn normalise_user_key(user: &str, default_provider: &str) -> String {
    if user.contains(':') {
        user.to_string()
    } else {
        format!("{default_provider}:{user}")
    }
}

/// Left-anchored method pattern match: `*` matches everything, a trailing
/// `/*` matches any non-empty suffix beneath the prefix, anything else is a
/// literal comparison.
fn matches_method(pattern: &str, path: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix("/*") {
        return path.len() > prefix.len() + 1
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'/';
    }

    pattern == path
}
