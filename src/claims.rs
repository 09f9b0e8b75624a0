//! Parsed capability-token claims.
//!
//! Replaces the reference implementation's untyped claims dict (`auth.py`
//! decodes into a bare `Dict[str, Any]`) with a typed struct carrying the
//! fields the core actually consults, plus an `extra` bucket for anything
//! else — per the redesign note in spec §9 ("unknown claims are preserved
//! but never consulted").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `aud` may be a single string or an ordered list of strings (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// Normalize to a list, as §4.4 requires before matching.
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Audience::One(s) => vec![s.as_str()],
            Audience::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }

    /// True if any entry in this audience claim is a bare `*` super-grant.
    /// Per spec §9's open question, tokens like this should be logged prominently.
    pub fn has_bare_wildcard(&self) -> bool {
        self.as_list().iter().any(|a| *a == "*")
    }
}

/// Capability-token claims (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: Audience,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub delegatee: Option<String>,
    /// Unknown fields: preserved, never consulted by the core.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// True if any granted capability is a bare `*` super-capability.
    /// Per spec §9, implementations should log such tokens prominently.
    pub fn has_bare_wildcard_capability(&self) -> bool {
        self.capabilities.iter().any(|c| c == "*")
    }
}

/// Decoded JWT header (just the fields the verifier needs).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub kid: Option<String>,
}
