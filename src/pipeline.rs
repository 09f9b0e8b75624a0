//! Admission Pipeline (AP) — spec §4.6.
//!
//! The five stages (Extract, Authenticate, Authorize, Guard, Dispatch) are
//! specified as data (the per-operation capability table) and implemented
//! here as small composable methods a service handler calls in sequence,
//! generalizing the teacher's `Middleware` trait (`middleware/core.rs`,
//! `middleware/auth.rs`) from its concrete before/after HTTP hook to the
//! concrete steps an RPC handler needs. Extract (pulling the token out of
//! the right payload field or metadata key per RPC) stays in each service
//! handler, since the carrier differs per operation (spec §4.6's "Token
//! carrier" column); Authenticate/Authorize/Guard are uniform and live here.
//! Dispatch (cache + handler + breaker bookkeeping) is also handler-specific
//! because only some operations are cacheable — see `cache.rs` and the
//! service modules for that half of the pipeline.

use std::sync::Arc;

use crate::breaker::{Admission, CircuitBreaker};
use crate::capability;
use crate::claims::Claims;
use crate::delegation;
use crate::error::{FabricError, TokenInvalidReason};
use crate::verifier::TokenVerifier;

pub struct Pipeline {
    verifier: Arc<TokenVerifier>,
    server_name: String,
}

impl Pipeline {
    pub fn new(verifier: Arc<TokenVerifier>, server_name: impl Into<String>) -> Self {
        Self {
            verifier,
            server_name: server_name.into(),
        }
    }

    /// Authenticate stage: verify the extracted token against this service's
    /// own name. An empty/missing carrier is `Unauthenticated`, matching
    /// every service fronting's "Missing <token>" abort in the reference.
    pub async fn authenticate(&self, token: &str) -> Result<Claims, FabricError> {
        if token.is_empty() {
            return Err(FabricError::unauthenticated(TokenInvalidReason::Malformed));
        }
        self.verifier.verify(token).await
    }

    /// Authorize stage: Capability Matcher over `required`; on denial, retry
    /// once through a delegation proof if one was supplied (spec §4.6).
    /// Returns whichever claim set (parent or delegated) ultimately granted
    /// the capability, so the caller can attribute telemetry correctly.
    pub async fn authorize(
        &self,
        claims: &Claims,
        required: &str,
        delegation_proof: Option<&str>,
    ) -> Result<Claims, FabricError> {
        if capability::matches(&claims.capabilities, required) {
            return Ok(claims.clone());
        }
        let proof = delegation_proof
            .ok_or_else(|| FabricError::PermissionDenied(format!("token lacks {required}")))?;
        let delegated =
            delegation::verify_delegation(&self.verifier, proof, &self.server_name, claims).await?;
        if !capability::matches(&delegated.capabilities, required) {
            return Err(FabricError::PermissionDenied(format!(
                "delegation proof lacks {required}"
            )));
        }
        Ok(delegated)
    }

    /// Authorize stage for the Event Bus's topic-scoped capabilities: try
    /// `<action>:<topic>` exactly, then the first-segment wildcard form
    /// `<action>:<first-segment>*` (spec §4.6's "first-segment" rule).
    pub fn authorize_topic(claims: &Claims, action: &str, topic: &str) -> bool {
        let exact = format!("{action}:{topic}");
        if capability::matches(&claims.capabilities, &exact) {
            return true;
        }
        let first_segment = topic.split(':').next().unwrap_or(topic);
        let wildcard = format!("{action}:{first_segment}*");
        capability::matches(&claims.capabilities, &wildcard)
    }

    /// Guard stage: consult the circuit breaker before dispatch.
    pub fn guard(breaker: &CircuitBreaker) -> Result<(), FabricError> {
        match breaker.admit() {
            Admission::Allowed => Ok(()),
            Admission::Rejected => {
                Err(FabricError::Unavailable("circuit breaker open".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::Audience;
    use std::collections::HashMap;

    fn claims_with(caps: &[&str]) -> Claims {
        Claims {
            iss: "idp".to_string(),
            sub: "OrderService".to_string(),
            aud: Audience::One("EventBusServer".to_string()),
            iat: 0,
            exp: i64::MAX,
            capabilities: caps.iter().map(|s| s.to_string()).collect(),
            delegatee: None,
            extra: HashMap::new(),
        }
    }

    #[test]
    fn authorize_topic_tries_exact_then_wildcard() {
        let exact = claims_with(&["event:publish:inventory:prod_12345:low_stock"]);
        assert!(Pipeline::authorize_topic(
            &exact,
            "event:publish",
            "inventory:prod_12345:low_stock"
        ));

        let wildcard = claims_with(&["event:publish:inventory*"]);
        assert!(Pipeline::authorize_topic(
            &wildcard,
            "event:publish",
            "inventory:prod_12345:low_stock"
        ));

        let unrelated = claims_with(&["event:publish:orders*"]);
        assert!(!Pipeline::authorize_topic(
            &unrelated,
            "event:publish",
            "inventory:prod_12345:low_stock"
        ));
    }

    #[test]
    fn guard_rejects_when_breaker_open() {
        let breaker = CircuitBreaker::new(1, std::time::Duration::from_secs(30));
        assert!(Pipeline::guard(&breaker).is_ok());
        breaker.record_failure();
        assert!(Pipeline::guard(&breaker).is_err());
    }
}
