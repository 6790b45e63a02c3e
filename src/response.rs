//! Response construction: turning a [`CheckResponse`] into forwarded
//! headers or a deny status/body (§4.6).

use std::collections::HashMap;

use serde::Serialize;

use crate::handler::{AllowContext, CheckResponse, DenyCode};

pub const HEADER_PROVIDER: &str = "x-auth-provider";
pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USERNAME: &str = "x-username";
pub const HEADER_USER_EMAIL: &str = "x-user-email";
pub const HEADER_ORG_CONSTRUCTS: &str = "x-org-constructs";

/// JSON body shape for a denied Check call.
#[derive(Debug, Serialize)]
pub struct DenyBody {
    pub error: String,
    pub message: String,
}

/// The fully-resolved shape of a Check response: either headers to forward
/// upstream, or a status code plus body to hand back to the caller.
pub enum Rendered {
    Allow { headers: HashMap<String, String> },
    Deny { status: u16, body: DenyBody },
}

/// Canonical outward code names from §6: `Unauthenticated`, `PermissionDenied`,
/// `Unavailable` -- matched verbatim, not relaxed to snake_case.
fn error_code_name(code: DenyCode) -> &'static str {
    match code {
        DenyCode::Unauthenticated => "Unauthenticated",
        DenyCode::PermissionDenied => "PermissionDenied",
        DenyCode::Unavailable => "Unavailable",
    }
}

/// `Unauthenticated` maps to 401; every other deny code maps to 403 (§4.6).
fn status_for(code: DenyCode) -> u16 {
    match code {
        DenyCode::Unauthenticated => 401,
        DenyCode::PermissionDenied | DenyCode::Unavailable => 403,
    }
}

fn allow_headers(context: &AllowContext) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(HEADER_PROVIDER.to_string(), context.provider.clone());
    headers.insert(HEADER_USER_ID.to_string(), context.user_id.clone());
    headers.insert(HEADER_USERNAME.to_string(), context.username.clone());

    if let Some(email) = &context.email {
        if !email.is_empty() {
            headers.insert(HEADER_USER_EMAIL.to_string(), email.clone());
        }
    }

    if !context.org_names.is_empty() {
        headers.insert(HEADER_ORG_CONSTRUCTS.to_string(), context.org_names.join(","));
    }

    headers
}

/// Render a [`CheckResponse`] into its wire shape.
pub fn render(response: &CheckResponse) -> Rendered {
    match response {
        CheckResponse::Allow(context) => Rendered::Allow {
            headers: allow_headers(context),
        },
        CheckResponse::Deny(reason) => Rendered::Deny {
            status: status_for(reason.code),
            body: DenyBody {
                error: error_code_name(reason.code).to_string(),
                message: reason.message.clone(),
            },
        },
    }
}
