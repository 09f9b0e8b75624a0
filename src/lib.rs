//! `agentmesh-fabric`: a capability-secured RPC fabric for multi-agent,
//! multi-service coordination.
//!
//! Three service frontings (Discovery Registry, Context/Tool Server, Event
//! Bus) share one Admission Pipeline: extract a bearer capability token,
//! verify it against a rotating JWKS (RS256 only), match it against the
//! operation's required capability (with an optional delegation-proof retry),
//! guard the call behind a per-service circuit breaker, then dispatch —
//! optionally through a response cache. See `pipeline::Pipeline` for the
//! shared stages and `services` for the three frontings built on top of it.

pub mod audience;
pub mod breaker;
pub mod cache;
pub mod capability;
pub mod claims;
pub mod config;
pub mod delegation;
pub mod error;
pub mod ids;
pub mod keyset;
pub mod pipeline;
pub mod services;
pub mod shutdown;
pub mod store;
pub mod telemetry;
pub mod verifier;
