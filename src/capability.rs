//! Capability Matcher (CM) — spec §4.3.
//!
//! A pure function with no state and no I/O: exact match or trailing-`*`
//! prefix match. Grounded on `auth.py::has_capability`, carried over
//! unchanged into Rust (no regex, no mid-string wildcard, no `?`).

/// Decide whether `granted` authorizes `required`.
///
/// Rules, in order, for each `cap` in `granted`:
/// - `cap == required` grants.
/// - `cap` ends with `*`: let `prefix = cap[..cap.len()-1]`; `required.starts_with(prefix)` grants.
/// - otherwise, keep looking.
///
/// A bare `*` (empty prefix) grants everything — a legitimate but dangerous
/// super-capability (spec §4.3, §9).
pub fn matches<S: AsRef<str>>(granted: &[S], required: &str) -> bool {
    granted.iter().any(|cap| {
        let cap = cap.as_ref();
        if cap == required {
            true
        } else if let Some(prefix) = cap.strip_suffix('*') {
            required.starts_with(prefix)
        } else {
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_grants() {
        assert!(matches(&["db:inventory:read"], "db:inventory:read"));
    }

    #[test]
    fn unrelated_exact_denies() {
        assert!(!matches(&["db:inventory:write"], "db:inventory:read"));
    }

    #[test]
    fn trailing_wildcard_grants_prefixed() {
        assert!(matches(&["db:inventory:*"], "db:inventory:read"));
        assert!(matches(&["db:inventory:*"], "db:inventory:write"));
    }

    #[test]
    fn wildcard_does_not_grant_unrelated_prefix() {
        assert!(!matches(&["db:inventory:*"], "db:orders:read"));
    }

    #[test]
    fn bare_wildcard_grants_everything() {
        assert!(matches(&["*"], "anything:at:all"));
    }

    #[test]
    fn no_mid_string_or_question_mark_wildcards() {
        // A literal '*' elsewhere in the string is not special.
        assert!(!matches(&["db:*:read"], "db:inventory:read"));
        assert!(!matches(&["db:inventor?:read"], "db:inventory:read"));
    }

    #[test]
    fn empty_granted_denies() {
        let empty: &[&str] = &[];
        assert!(!matches(empty, "db:inventory:read"));
    }

    #[test]
    fn first_matching_entry_short_circuits() {
        assert!(matches(&["tool:a", "tool:compute_pricing"], "tool:compute_pricing"));
    }
}
