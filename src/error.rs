//! Fabric-wide error type and its mapping onto RPC status categories.
//!
//! Every admission-pipeline stage and every service fronting handler returns
//! `Result<_, FabricError>`. The variants line up 1:1 with the status
//! categories a caller observes (`Unauthenticated`, `PermissionDenied`, ...);
//! `FabricError::status_code()` performs that mapping so a single call site
//! in each `tonic` service impl can translate failures into `tonic::Status`.

use std::fmt;

/// Sub-reason for an `Unauthenticated` failure, surfaced in logs but not to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenInvalidReason {
    Expired,
    NotYetValid,
    BadSignature,
    BadIssuer,
    BadAudience,
    UnknownKid,
    MissingKid,
    UnsupportedAlgorithm,
    Malformed,
}

impl fmt::Display for TokenInvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenInvalidReason::Expired => "expired",
            TokenInvalidReason::NotYetValid => "not-yet-valid",
            TokenInvalidReason::BadSignature => "bad-signature",
            TokenInvalidReason::BadIssuer => "bad-issuer",
            TokenInvalidReason::BadAudience => "bad-audience",
            TokenInvalidReason::UnknownKid => "unknown-kid",
            TokenInvalidReason::MissingKid => "missing-kid",
            TokenInvalidReason::UnsupportedAlgorithm => "unsupported-algorithm",
            TokenInvalidReason::Malformed => "malformed",
        };
        f.write_str(s)
    }
}

/// The fabric's single error type.
///
/// Mirrors the table in spec §7. `message` is the redacted, caller-facing
/// text; any sensitive detail (exception chains, backend error strings)
/// belongs in a `tracing::error!` call at the raise site, not in this field.
#[derive(Debug)]
pub enum FabricError {
    Unauthenticated {
        reason: TokenInvalidReason,
        message: String,
    },
    PermissionDenied(String),
    /// Delegation proof's `iss`/`sub` don't continue the parent token's identity,
    /// or its `delegatee` doesn't name the verifying service (spec §4.5 steps 2-3).
    DelegationMismatch(String),
    CapabilityEscalation(String),
    Unavailable(String),
    InvalidArgument(String),
    Internal(String),
    KeyFetchError(String),
}

impl FabricError {
    pub fn unauthenticated(reason: TokenInvalidReason) -> Self {
        FabricError::Unauthenticated {
            message: format!("token invalid: {reason}"),
            reason,
        }
    }

    /// The `tonic::Status` equivalent for this error, per spec §7's table.
    pub fn into_status(self) -> tonic::Status {
        match self {
            FabricError::Unauthenticated { message, .. } => {
                tonic::Status::unauthenticated(message)
            }
            FabricError::PermissionDenied(m) => tonic::Status::permission_denied(m),
            FabricError::DelegationMismatch(m) => tonic::Status::permission_denied(m),
            FabricError::CapabilityEscalation(m) => tonic::Status::permission_denied(m),
            FabricError::Unavailable(m) => tonic::Status::unavailable(m),
            FabricError::InvalidArgument(m) => tonic::Status::invalid_argument(m),
            FabricError::Internal(m) => tonic::Status::internal(m),
            FabricError::KeyFetchError(m) => tonic::Status::internal(m),
        }
    }

    /// True for errors a retry might resolve (key-fetch transient failures).
    pub fn is_retryable(&self) -> bool {
        matches!(self, FabricError::KeyFetchError(_))
    }
}

impl fmt::Display for FabricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FabricError::Unauthenticated { message, .. } => write!(f, "unauthenticated: {message}"),
            FabricError::PermissionDenied(m) => write!(f, "permission denied: {m}"),
            FabricError::DelegationMismatch(m) => write!(f, "delegation mismatch: {m}"),
            FabricError::CapabilityEscalation(m) => write!(f, "capability escalation: {m}"),
            FabricError::Unavailable(m) => write!(f, "unavailable: {m}"),
            FabricError::InvalidArgument(m) => write!(f, "invalid argument: {m}"),
            FabricError::Internal(m) => write!(f, "internal: {m}"),
            FabricError::KeyFetchError(m) => write!(f, "key fetch error: {m}"),
        }
    }
}

impl std::error::Error for FabricError {}

impl From<FabricError> for tonic::Status {
    fn from(e: FabricError) -> Self {
        e.into_status()
    }
}
