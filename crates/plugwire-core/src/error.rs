// ── Core error types ──
//
// Caller-facing errors from plugwire-core. Transport and cipher failures
// keep their kind on the way up (timeout stays timeout, decode stays
// decode); the `From<plugwire_api::Error>` impl is a one-to-one mapping.

use serde_json::Value;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Transport errors ─────────────────────────────────────────────
    #[error("Device at {host}:{port} did not respond within {timeout_ms}ms")]
    Timeout {
        host: String,
        port: u16,
        timeout_ms: u64,
    },

    #[error("Cannot reach device at {host}:{port}: {reason}")]
    Transport {
        host: String,
        port: u16,
        reason: String,
    },

    // ── Data errors ──────────────────────────────────────────────────
    /// The reply did not decode into a JSON envelope.
    #[error("Could not decode device response: {message}")]
    Decode { message: String, body: String },

    /// Well-formed JSON, but at least one result's `err_code` was missing
    /// or non-zero. `response` is the full parsed reply.
    #[error("Device rejected the command: {message}")]
    ResponseValidation {
        message: String,
        /// The result objects that failed validation.
        errors: Vec<Value>,
        response: Value,
    },

    #[error("Invalid child id '{child_id}': {reason}")]
    Addressing { child_id: String, reason: String },

    #[error("Invalid command: {reason}")]
    InvalidCommand { reason: String },

    // ── Device model errors ──────────────────────────────────────────
    #[error("Descriptor for device {expected} cannot be replaced by one for {got}")]
    IdentityMismatch { expected: String, got: String },

    #[error("Operation not supported: {operation} (requires {required})")]
    Unsupported { operation: String, required: String },

    #[error("Device not found: {identifier}")]
    NotFound { identifier: String },

    // ── Discovery errors ─────────────────────────────────────────────
    #[error("Discovery failed: {message}")]
    Discovery { message: String },
}

impl CoreError {
    /// The device could not be reached (offline, wrong address, timeout).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport { .. })
    }

    /// The device answered but refused the command.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::ResponseValidation { .. })
    }

    /// The raw response carried by a validation failure, if any.
    pub fn response(&self) -> Option<&Value> {
        match self {
            Self::ResponseValidation { response, .. } => Some(response),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<plugwire_api::Error> for CoreError {
    fn from(err: plugwire_api::Error) -> Self {
        match err {
            plugwire_api::Error::Timeout {
                host,
                port,
                timeout_ms,
            } => CoreError::Timeout {
                host,
                port,
                timeout_ms,
            },
            plugwire_api::Error::Connection { host, port, source } => CoreError::Transport {
                host,
                port,
                reason: source.to_string(),
            },
            plugwire_api::Error::Bind { address, source } => CoreError::Transport {
                host: address,
                port: 0,
                reason: format!("bind failed: {source}"),
            },
            plugwire_api::Error::Decode { message, body } => CoreError::Decode { message, body },
            plugwire_api::Error::PayloadTooLarge { len } => CoreError::Decode {
                message: format!("request payload too large to frame ({len} bytes)"),
                body: String::new(),
            },
        }
    }
}
