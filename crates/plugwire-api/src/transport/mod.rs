// Transport strategies for the device protocol.
//
// Every call is independent: TCP opens and closes its own connection,
// UDP unary binds its own ephemeral socket. Nothing is pooled, so any
// number of calls against different devices may run concurrently.
// The long-lived discovery socket lives in `udp::DiscoverySocket`.

pub mod tcp;
pub mod udp;

use std::fmt;
use std::time::Duration;

use crate::cipher::DEFAULT_KEY;
use crate::error::Error;

/// Default TCP/UDP port devices listen on.
pub const DEFAULT_PORT: u16 = 9999;

/// Which wire strategy a request travels over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Length-prefixed ciphertext over a fresh TCP connection.
    #[default]
    Tcp,
    /// One bare-encoded datagram, reply correlated by source address.
    Udp,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

/// Per-call transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub kind: TransportKind,
    /// Upper bound on the whole exchange (connect, write, read).
    pub timeout: Duration,
    /// Initial cipher key. Every known firmware uses [`DEFAULT_KEY`].
    pub key: u8,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Tcp,
            timeout: Duration::from_secs(10),
            key: DEFAULT_KEY,
        }
    }
}

impl TransportConfig {
    pub fn with_kind(mut self, kind: TransportKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `payload` to `host:port` and return the decoded reply text.
    pub async fn send(&self, host: &str, port: u16, payload: &str) -> Result<String, Error> {
        match self.kind {
            TransportKind::Tcp => tcp::send(host, port, payload, self).await,
            TransportKind::Udp => udp::send(host, port, payload, self).await,
        }
    }

    pub(crate) fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Turn decoded bytes into text, reporting invalid UTF-8 as a decode error.
pub(crate) fn into_text(plaintext: Vec<u8>) -> Result<String, Error> {
    String::from_utf8(plaintext).map_err(|e| {
        let bytes = e.as_bytes().to_vec();
        Error::decode(format!("reply is not valid UTF-8: {}", e.utf8_error()), &bytes)
    })
}
