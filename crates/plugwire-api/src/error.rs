use thiserror::Error;

/// Top-level error type for the `plugwire-api` crate.
///
/// Covers every failure mode of the wire layer: framing, cipher output,
/// TCP and UDP transport. `plugwire-core` maps these into caller-facing
/// error kinds without changing their meaning.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// No complete response arrived within the configured timeout.
    #[error("Request to {host}:{port} timed out after {timeout_ms}ms")]
    Timeout {
        host: String,
        port: u16,
        timeout_ms: u64,
    },

    /// Socket-level failure (connect refused, reset, unreachable, etc.)
    #[error("Connection to {host}:{port} failed: {source}")]
    Connection {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind a local UDP socket.
    #[error("Failed to bind UDP socket on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// The reply could not be deframed or decoded into text.
    /// `body` carries whatever bytes were received, lossily decoded.
    #[error("Decode error: {message}")]
    Decode { message: String, body: String },

    /// Payload larger than the 4-byte length header can describe.
    #[error("Payload too large for framing: {len} bytes")]
    PayloadTooLarge { len: usize },
}

impl Error {
    /// Returns `true` if the device did not answer in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the failure happened below the protocol layer,
    /// i.e. the device is unreachable rather than misbehaving.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Connection { .. } | Self::Bind { .. }
        )
    }

    /// Returns `true` for socket errors a receive loop can shrug off.
    ///
    /// Some platforms surface an ICMP port-unreachable for an earlier send
    /// as a reset or refusal on the next receive; the socket stays usable.
    pub fn is_transient(&self) -> bool {
        use std::io::ErrorKind;

        match self {
            Self::Connection { source, .. } => matches!(
                source.kind(),
                ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused | ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    pub(crate) fn decode(message: impl Into<String>, body: &[u8]) -> Self {
        Self::Decode {
            message: message.into(),
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;

    use super::*;

    fn connection(kind: io::ErrorKind) -> Error {
        Error::Connection {
            host: "discovery socket".into(),
            port: 0,
            source: io::Error::from(kind),
        }
    }

    #[test]
    fn reset_and_refused_are_transient() {
        assert!(connection(io::ErrorKind::ConnectionReset).is_transient());
        assert!(connection(io::ErrorKind::ConnectionRefused).is_transient());
        assert!(connection(io::ErrorKind::Interrupted).is_transient());
    }

    #[test]
    fn other_failures_are_not_transient() {
        assert!(!connection(io::ErrorKind::PermissionDenied).is_transient());
        assert!(!connection(io::ErrorKind::NotConnected).is_transient());
        let timeout = Error::Timeout {
            host: "10.0.0.2".into(),
            port: 9999,
            timeout_ms: 100,
        };
        assert!(!timeout.is_transient());
        assert!(!Error::PayloadTooLarge { len: 1 }.is_transient());
    }
}
