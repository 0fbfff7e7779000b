// ── Client facade ──
//
// Entry point for consumers: raw sends, device construction, discovery
// lifecycle, and the device registry. Configuration is held per client,
// so independently configured clients can share a process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};

use crate::config::{ClientConfig, DiscoveryOptions, SendOptions};
use crate::device::{Device, DeviceOptions, parse_sys_info};
use crate::discovery::{DiscoverySession, PresenceEngine};
use crate::error::CoreError;
use crate::event::DiscoveryEvent;
use crate::model::SysInfo;
use crate::protocol::{self, GET_SYSINFO};
use crate::store::{DeviceRegistry, DeviceStream};

const EVENT_CHANNEL_SIZE: usize = 256;

/// Cheaply cloneable via `Arc<ClientInner>`.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    registry: Arc<DeviceRegistry>,
    events: broadcast::Sender<DiscoveryEvent>,
    /// Discovery cycle counter; kept across sessions so devices registered
    /// in an earlier session age out correctly.
    sequence: Arc<AtomicU64>,
    session: Mutex<Option<DiscoverySession>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(ClientInner {
                config,
                registry: Arc::new(DeviceRegistry::new()),
                events,
                sequence: Arc::new(AtomicU64::new(0)),
                session: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // ── Unary requests ───────────────────────────────────────────────

    /// Send raw text to `host` and return the decoded reply. No envelope
    /// processing or validation.
    pub async fn send(
        &self,
        payload: &str,
        host: &str,
        port: Option<u16>,
        options: SendOptions,
    ) -> Result<String, CoreError> {
        let port = port.unwrap_or(self.inner.config.default_port);
        let transport = options.apply(self.inner.config.transport);
        debug!(host, port, transport = %transport.kind, "client send");
        Ok(transport.send(host, port, payload).await?)
    }

    /// Fetch a descriptor without creating a device.
    pub async fn get_sys_info(
        &self,
        host: &str,
        port: Option<u16>,
        options: SendOptions,
    ) -> Result<SysInfo, CoreError> {
        let reply = self.send(GET_SYSINFO, host, port, options).await?;
        let response = protocol::parse_response(&reply)?;
        let command = protocol::parse_command(GET_SYSINFO)?;
        parse_sys_info(protocol::process_response(&command, &response)?)
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// A device handle with no descriptor yet. Nothing is sent.
    pub fn new_device(&self, options: DeviceOptions) -> Device {
        Device::new(options, &self.inner.config)
    }

    /// Fetch the descriptor and return a device of the matching kind.
    pub async fn get_device(&self, options: DeviceOptions) -> Result<Device, CoreError> {
        let device = self.new_device(options);
        device.get_sys_info(SendOptions::default()).await?;
        Ok(device)
    }

    /// Build a device from an already-known descriptor.
    pub fn device_from_sys_info(
        &self,
        sys_info: SysInfo,
        options: DeviceOptions,
    ) -> Result<Device, CoreError> {
        Device::from_sys_info(sys_info, options, &self.inner.config)
    }

    // ── Registry ─────────────────────────────────────────────────────

    /// Known devices, sorted by id.
    pub fn devices(&self) -> Arc<Vec<Device>> {
        self.inner.registry.snapshot()
    }

    pub fn device(&self, id: &str) -> Option<Device> {
        self.inner.registry.get(id)
    }

    /// Forget a device. Discovery re-registers it on its next reply.
    pub fn remove_device(&self, id: &str) -> Option<Device> {
        let removed = self.inner.registry.remove(id);
        if removed.is_some() {
            debug!(id, "device removed from registry");
        }
        removed
    }

    pub fn subscribe_devices(&self) -> DeviceStream {
        DeviceStream::new(self.inner.registry.subscribe())
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Discovery notifications. Subscriptions outlive individual sessions.
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.inner.events.subscribe()
    }

    /// Start probing. A running session is stopped first.
    pub async fn start_discovery(&self, options: DiscoveryOptions) -> Result<(), CoreError> {
        let mut session = self.inner.session.lock().await;
        if let Some(previous) = session.take() {
            previous.stop();
        }

        let engine = PresenceEngine::new(
            Arc::clone(&self.inner.registry),
            self.inner.config.clone(),
            &options,
            Arc::clone(&self.inner.sequence),
        );
        let started = DiscoverySession::start(
            options,
            self.inner.config.transport.key,
            engine,
            self.inner.events.clone(),
        )
        .await?;

        *session = Some(started);
        Ok(())
    }

    /// Stop probing. Known devices stay in the registry.
    pub async fn stop_discovery(&self) {
        if let Some(session) = self.inner.session.lock().await.take() {
            session.stop();
            info!(known = self.inner.registry.len(), "discovery stopped");
        }
    }

    /// `true` while a session is running (it may have auto-stopped).
    pub async fn is_discovering(&self) -> bool {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .is_some_and(DiscoverySession::is_running)
    }

    /// Local address of the discovery socket, if a session is running.
    pub async fn discovery_addr(&self) -> Option<SocketAddr> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(DiscoverySession::local_addr)
    }
}
