//! Strongly typed request identifier used to correlate telemetry records
//! across services, backed by `ulid` (already a teacher dependency).

use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_ids_are_generated() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn display_matches_ulid_string_form() {
        let id = RequestId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}
