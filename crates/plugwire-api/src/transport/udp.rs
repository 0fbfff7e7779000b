// UDP transports.
//
// The protocol carries no request id, so replies are correlated purely by
// source address. `send` is the unary variant (own ephemeral socket per
// call). `DiscoverySocket` is the long-lived broadcast socket a discovery
// session owns; only one probe cycle should be outstanding on it at a time.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::{UdpSocket, lookup_host};
use tracing::{debug, trace};

use super::{TransportConfig, into_text};
use crate::cipher;
use crate::error::Error;

/// Largest datagram we are prepared to receive.
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// Send one bare-encoded datagram to `host:port` and await the first reply
/// whose source matches the device.
pub async fn send(
    host: &str,
    port: u16,
    payload: &str,
    config: &TransportConfig,
) -> Result<String, Error> {
    debug!(%host, port, "udp send");

    let exchange = exchange(host, port, payload, config);
    match tokio::time::timeout(config.timeout, exchange).await {
        Ok(result) => result,
        Err(_) => {
            debug!(%host, port, timeout_ms = config.timeout_ms(), "udp send timed out");
            Err(Error::Timeout {
                host: host.to_owned(),
                port,
                timeout_ms: config.timeout_ms(),
            })
        }
    }
}

async fn exchange(
    host: &str,
    port: u16,
    payload: &str,
    config: &TransportConfig,
) -> Result<String, Error> {
    let io_err = |source: std::io::Error| Error::Connection {
        host: host.to_owned(),
        port,
        source,
    };

    let target = resolve(host, port).await?;
    let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
    let socket = UdpSocket::bind(bind_addr).await.map_err(|source| Error::Bind {
        address: bind_addr.to_string(),
        source,
    })?;
    socket.set_broadcast(true).map_err(io_err)?;

    let datagram = cipher::encode(payload.as_bytes(), config.key);
    socket.send_to(&datagram, target).await.map_err(io_err)?;

    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, from) = socket.recv_from(&mut buf).await.map_err(io_err)?;
        if from != target {
            trace!(%from, expected = %target, "ignoring datagram from unexpected peer");
            continue;
        }
        if len == 0 {
            return Err(Error::decode("empty datagram", &[]));
        }
        return into_text(cipher::decode(&buf[..len], config.key));
    }
}

/// Resolve `host:port` to the first IPv4 socket address.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, Error> {
    let not_found = || Error::Connection {
        host: host.to_owned(),
        port,
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "host did not resolve"),
    };

    let addrs = lookup_host((host, port))
        .await
        .map_err(|source| Error::Connection {
            host: host.to_owned(),
            port,
            source,
        })?;

    let mut first = None;
    for addr in addrs {
        if addr.is_ipv4() {
            return Ok(addr);
        }
        first.get_or_insert(addr);
    }
    first.ok_or_else(not_found)
}

// ── DiscoverySocket ──────────────────────────────────────────────────

/// A decoded datagram and the address it came from.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub from: SocketAddr,
    pub plaintext: Vec<u8>,
}

/// Shared broadcast-capable socket for a discovery session.
///
/// Owned by exactly one task; sends and receives are serialized by that
/// task's event loop.
#[derive(Debug)]
pub struct DiscoverySocket {
    socket: UdpSocket,
    key: u8,
}

impl DiscoverySocket {
    /// Bind to `addr` (port 0 for ephemeral) with broadcast enabled.
    pub async fn bind(addr: SocketAddr, key: u8) -> Result<Self, Error> {
        let bind_err = |source| Error::Bind {
            address: addr.to_string(),
            source,
        };
        let socket = UdpSocket::bind(addr).await.map_err(bind_err)?;
        socket.set_broadcast(true).map_err(bind_err)?;

        if let Ok(local) = socket.local_addr() {
            debug!(%local, "discovery socket listening");
        }

        Ok(Self { socket, key })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.socket.local_addr().map_err(|source| Error::Bind {
            address: "discovery socket".into(),
            source,
        })
    }

    /// Encode `payload` and send it as one datagram to `target`.
    pub async fn send_to(&self, payload: &[u8], target: SocketAddr) -> Result<(), Error> {
        let datagram = cipher::encode(payload, self.key);
        self.socket
            .send_to(&datagram, target)
            .await
            .map_err(|source| Error::Connection {
                host: target.ip().to_string(),
                port: target.port(),
                source,
            })?;
        trace!(%target, bytes = datagram.len(), "discovery probe sent");
        Ok(())
    }

    /// Receive and decode the next datagram. Cancel-safe.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<Datagram, Error> {
        let (len, from) = self
            .socket
            .recv_from(buf)
            .await
            .map_err(|source| Error::Connection {
                host: "discovery socket".into(),
                port: 0,
                source,
            })?;
        Ok(Datagram {
            from,
            plaintext: cipher::decode(&buf[..len], self.key),
        })
    }
}
