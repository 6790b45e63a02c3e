//! Canonical identity and organizational-unit records returned by providers.

use std::collections::HashMap;

/// A validated user, as returned by a [`Provider::validate`](crate::provider::Provider::validate)
/// call.
///
/// `attributes` carries provider-specific extras (avatar URL, display name,
/// profile URL, ...) and must never be used as an authorization input -- only
/// `provider`, `user_id` and `username` feed the policy engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Canonical provider identifier, e.g. `"github"`.
    pub provider: String,
    /// The provider's stable unique identifier (numeric id, GUID, subject claim).
    pub user_id: String,
    /// Human-readable handle.
    pub username: String,
    /// Not all providers guarantee an email address.
    pub email: Option<String>,
    /// Provider-specific extras. Never consulted for authorization decisions.
    pub attributes: HashMap<String, String>,
}

impl Identity {
    /// The fully-qualified user key used as the policy subject: `"<provider>:<username>"`.
    pub fn user_key(&self) -> String {
        format!("{}:{}", self.provider, self.username)
    }
}

/// A provider-specific group the user belongs to, normalised to `(id, name, type)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgUnit {
    pub id: String,
    pub name: String,
    pub kind: OrgUnitKind,
}

/// Discriminant for the native grouping concept a provider normalises from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgUnitKind {
    GitHubOrg,
    AzureTenant,
    GoogleDomain,
    AwsAccount,
}

impl OrgUnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgUnitKind::GitHubOrg => "github-org",
            OrgUnitKind::AzureTenant => "azure-tenant",
            OrgUnitKind::GoogleDomain => "google-domain",
            OrgUnitKind::AwsAccount => "aws-account",
        }
    }
}
