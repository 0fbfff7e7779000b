// ── Discovery session ──
//
// One task per session owns the UDP socket and the presence engine. Timer
// ticks, replies, cancellation, and the optional auto-stop all flow
// through a single `select!`, so the offline scan never races a reply.

mod engine;
mod filter;

pub use filter::{DiscoveryFilter, Rejection};

pub(crate) use engine::PresenceEngine;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use plugwire_api::transport::udp::{MAX_DATAGRAM, resolve};
use plugwire_api::{DEFAULT_PORT, DiscoverySocket};

use crate::config::{DiscoveryOptions, DiscoveryTarget};
use crate::error::CoreError;
use crate::event::DiscoveryEvent;
use crate::protocol::DISCOVERY_PROBE;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// A running discovery session. Stopped by [`stop`](Self::stop) or on drop.
#[derive(Debug)]
pub(crate) struct DiscoverySession {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl DiscoverySession {
    /// Bind the socket and spawn the session loop.
    pub(crate) async fn start(
        options: DiscoveryOptions,
        key: u8,
        engine: PresenceEngine,
        events: broadcast::Sender<DiscoveryEvent>,
    ) -> Result<Self, CoreError> {
        let socket = DiscoverySocket::bind(options.bind_address, key)
            .await
            .map_err(|e| CoreError::Discovery {
                message: e.to_string(),
            })?;
        let local_addr = socket.local_addr().map_err(|e| CoreError::Discovery {
            message: e.to_string(),
        })?;
        info!(%local_addr, broadcast = %options.broadcast_target(), "discovery started");

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(socket, options, engine, events, cancel.clone()));

        Ok(Self {
            cancel,
            task,
            local_addr,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the timer and close the socket. Does not wait.
    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for DiscoverySession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Session loop ─────────────────────────────────────────────────────

async fn run(
    socket: DiscoverySocket,
    options: DiscoveryOptions,
    engine: PresenceEngine,
    events: broadcast::Sender<DiscoveryEvent>,
    cancel: CancellationToken,
) {
    let publish = |batch: Vec<DiscoveryEvent>| {
        for event in batch {
            let _ = events.send(event);
        }
    };

    let mut ticker = tokio::time::interval(options.interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = (!options.timeout.is_zero()).then(|| Instant::now() + options.timeout);
    let auto_stop = async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(auto_stop);

    let broadcast = options.broadcast_target();
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = &mut auto_stop => {
                info!("discovery timeout reached");
                break;
            }
            _ = ticker.tick() => {
                publish(engine.scan_offline());
                send_probes(&socket, broadcast, &options.targets).await;
                engine.advance();
            }
            received = socket.recv(&mut buf) => match received {
                Ok(datagram) => publish(engine.handle_datagram(&datagram)),
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "discovery receive failed, continuing");
                }
                Err(e) => {
                    error!(error = %e, "discovery socket failed");
                    publish(vec![DiscoveryEvent::Error(Arc::new(CoreError::from(e)))]);
                    break;
                }
            },
        }
    }

    debug!(sequence = engine.sequence(), "discovery stopped");
}

/// Broadcast the probe, then unicast it to each explicit target.
/// Send failures are logged; one unreachable target does not end the cycle.
async fn send_probes(socket: &DiscoverySocket, broadcast: SocketAddr, targets: &[DiscoveryTarget]) {
    let probe = DISCOVERY_PROBE.as_bytes();

    if let Err(e) = socket.send_to(probe, broadcast).await {
        warn!(%broadcast, error = %e, "discovery broadcast failed");
    }

    for target in targets {
        let port = target.port.unwrap_or(DEFAULT_PORT);
        let addr = match resolve(&target.host, port).await {
            Ok(addr) => addr,
            Err(e) => {
                warn!(host = %target.host, error = %e, "discovery target did not resolve");
                continue;
            }
        };
        if let Err(e) = socket.send_to(probe, addr).await {
            warn!(%addr, error = %e, "discovery unicast failed");
        }
    }
}
