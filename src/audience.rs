//! Audience Matcher (AM) — spec §4.4.
//!
//! Pure function analogous to the Capability Matcher: normalizes the `aud`
//! claim (scalar or list) to a list, then applies the same exact-or-suffix-
//! wildcard rule. Used both by the Token Verifier's own audience check
//! (which is always exact, no wildcard — spec §4.2 step 5) and by the
//! Registry's Lookup to filter results against the caller's audience claim.

use crate::claims::Audience;

/// Exact-or-wildcard match of `target` against the normalized `aud_claim`.
pub fn matches(aud_claim: &Audience, target: &str) -> bool {
    aud_claim.as_list().iter().any(|aud| {
        if *aud == target {
            true
        } else if let Some(prefix) = aud.strip_suffix('*') {
            target.starts_with(prefix)
        } else {
            false
        }
    })
}

/// Exact match only, no wildcard — used by the Token Verifier (spec §4.2 step 5).
pub fn matches_exact(aud_claim: &Audience, target: &str) -> bool {
    aud_claim.as_list().iter().any(|aud| *aud == target)
}
