//! Structured logging init + the per-call telemetry record.
//!
//! `init_logging` is a trimmed version of the teacher's `otel::init_logging`
//! (`otel.rs`): same `LogFormat` (json/pretty) selectable via env var, same
//! `tracing-subscriber` `EnvFilter` + `tracing-appender` non-blocking writer
//! shape. We drop the teacher's redaction-level/sampling-mode/rate-limit
//! custom `Layer` machinery — this fabric has no equivalent requirement in
//! scope — and keep only level + format, noted as a deliberate trim in
//! DESIGN.md.
//!
//! `TelemetryRecord` replaces the original Python reference's untyped
//! `TelemetryLogger.log(dict)` call sites (`middleware.py`) with a small
//! builder that always emits exactly one structured `tracing::info!` event
//! per call (spec §5: "one record per call; never two").

use std::env;
use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::ids::RequestId;

/// Log format: JSON for production, pretty-print for local development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }

    fn from_env() -> Self {
        Self::parse(&env::var("FABRIC_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()))
    }
}

/// Initialize the global `tracing` subscriber for a service binary.
///
/// Returns a `WorkerGuard` that must be kept alive for the process lifetime
/// (dropping it flushes and stops the non-blocking writer), matching the
/// teacher's `otel::init_logging` contract.
pub fn init_logging(service_name: &str) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let builder = fmt().with_env_filter(filter).with_writer(writer);

    match LogFormat::from_env() {
        LogFormat::Json => builder
            .json()
            .with_current_span(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("installing json tracing subscriber")?,
        LogFormat::Pretty => builder
            .pretty()
            .try_init()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("installing pretty tracing subscriber")?,
    }

    info!(service = service_name, "logging initialized");
    Ok(guard)
}

/// Builder for the single telemetry event emitted per admission-pipeline call.
pub struct TelemetryRecord {
    fields: Map<String, Value>,
    started_at: Instant,
}

impl TelemetryRecord {
    /// Starts a record for one admission-pipeline call, stamping a freshly
    /// generated `request_id` (spec: every telemetry event carries one for
    /// cross-service correlation, mirroring the reference's per-call log line).
    pub fn start(method: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("method".to_string(), json!(method));
        fields.insert("request_id".to_string(), json!(RequestId::new().to_string()));
        Self {
            fields,
            started_at: Instant::now(),
        }
    }

    pub fn client(mut self, client: impl Into<String>) -> Self {
        self.fields.insert("client".to_string(), json!(client.into()));
        self
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    fn finish(mut self, status: &str) {
        self.fields.insert(
            "latency_ms".to_string(),
            json!(self.started_at.elapsed().as_millis() as u64),
        );
        self.fields.insert("status".to_string(), json!(status));
        info!(telemetry = %Value::Object(self.fields), "call completed");
    }

    pub fn emit_success(self) {
        self.finish("success");
    }

    pub fn emit_failure(self, reason: &str) {
        self.finish(&format!("failure: {reason}"));
    }

    pub fn emit_circuit_open(self) {
        self.finish("circuit_open");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_known_values() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("whatever"), LogFormat::Json);
    }

    #[test]
    fn telemetry_record_carries_fields_through_to_json() {
        let record = TelemetryRecord::start("RequestContext")
            .client("OrderService")
            .field("cache_hit", true);
        assert_eq!(record.fields.get("method"), Some(&json!("RequestContext")));
        assert_eq!(record.fields.get("client"), Some(&json!("OrderService")));
        assert_eq!(record.fields.get("cache_hit"), Some(&json!(true)));
    }

    #[test]
    fn each_record_gets_a_distinct_request_id() {
        let a = TelemetryRecord::start("Lookup");
        let b = TelemetryRecord::start("Lookup");
        assert_ne!(a.fields.get("request_id"), b.fields.get("request_id"));
    }
}
