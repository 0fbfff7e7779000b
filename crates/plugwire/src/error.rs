//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use plugwire_config::ConfigError;
use plugwire_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Reachability ─────────────────────────────────────────────────
    #[error("Could not reach device at {address}: {reason}")]
    #[diagnostic(
        code(plugwire::unreachable),
        help(
            "Check that the device is powered and on this network.\n\
             Some firmware only answers one protocol; try --udp."
        )
    )]
    Unreachable { address: String, reason: String },

    #[error("Device at {address} did not answer within {timeout_ms}ms")]
    #[diagnostic(
        code(plugwire::timeout),
        help("Increase the timeout with --timeout, or try --udp.")
    )]
    Timeout { address: String, timeout_ms: u64 },

    #[error("Discovery failed: {message}")]
    #[diagnostic(
        code(plugwire::discovery),
        help("Another process may hold the discovery port, or the broadcast address is wrong.")
    )]
    Discovery { message: String },

    // ── Device answers ───────────────────────────────────────────────
    #[error("Device rejected the command: {message}")]
    #[diagnostic(code(plugwire::rejected), help("Raw response: {response}"))]
    Rejected { message: String, response: String },

    #[error("Unexpected response: {message}")]
    #[diagnostic(code(plugwire::invalid_response))]
    InvalidResponse { message: String },

    #[error("Operation '{operation}' is not supported by this device")]
    #[diagnostic(code(plugwire::unsupported), help("This command requires a {required}."))]
    Unsupported { operation: String, required: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(plugwire::not_found),
        help("Run: plugwire {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(plugwire::validation))]
    Validation { field: String, reason: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(plugwire::confirmation_required),
        help("Re-run with --yes (-y) to confirm.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("{source}")]
    #[diagnostic(code(plugwire::config), help("Config file: {path}"))]
    Config {
        #[source]
        source: ConfigError,
        path: String,
    },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(plugwire::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } | Self::Discovery { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Config { .. }
            | Self::InvalidResponse { .. }
            | Self::Io(_)
            | Self::Json(_) => exit_code::GENERAL,
        }
    }

    pub fn config(source: ConfigError, path: &std::path::Path) -> Self {
        Self::Config {
            source,
            path: path.display().to_string(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Timeout {
                host,
                port,
                timeout_ms,
            } => CliError::Timeout {
                address: format!("{host}:{port}"),
                timeout_ms,
            },

            CoreError::Transport { host, port, reason } => CliError::Unreachable {
                address: format!("{host}:{port}"),
                reason,
            },

            CoreError::Decode { message, .. } => CliError::InvalidResponse { message },

            CoreError::ResponseValidation {
                message, response, ..
            } => CliError::Rejected {
                message,
                response: response.to_string(),
            },

            CoreError::Addressing { child_id, reason } => CliError::Validation {
                field: "child".into(),
                reason: format!("'{child_id}': {reason}"),
            },

            CoreError::InvalidCommand { reason } => CliError::Validation {
                field: "command".into(),
                reason,
            },

            CoreError::IdentityMismatch { expected, got } => CliError::InvalidResponse {
                message: format!("expected device {expected}, got {got}"),
            },

            CoreError::Unsupported {
                operation,
                required,
            } => CliError::Unsupported {
                operation,
                required,
            },

            CoreError::NotFound { identifier } => CliError::NotFound {
                resource_type: "device".into(),
                identifier,
                list_command: "search".into(),
            },

            CoreError::Discovery { message } => CliError::Discovery { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unreachable_and_rejected_have_distinct_exit_codes() {
        let offline = CliError::from(CoreError::Transport {
            host: "10.0.0.9".into(),
            port: 9999,
            reason: "connection refused".into(),
        });
        let rejected = CliError::from(CoreError::ResponseValidation {
            message: "err_code -1: module not support".into(),
            errors: vec![json!({ "err_code": -1 })],
            response: json!({ "system": { "reboot": { "err_code": -1 } } }),
        });

        assert_eq!(offline.exit_code(), exit_code::CONNECTION);
        assert_eq!(rejected.exit_code(), exit_code::REJECTED);
        assert!(offline.to_string().contains("10.0.0.9:9999"));
    }

    #[test]
    fn timeout_keeps_its_kind() {
        let err = CliError::from(CoreError::Timeout {
            host: "lamp".into(),
            port: 9999,
            timeout_ms: 500,
        });
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
    }
}
