// ── Runtime configuration ──
//
// These types describe *how* to talk to devices: default transport,
// timeouts, and discovery tuning. They never touch disk; the CLI (or any
// other consumer) constructs them and hands them in, so several
// independently configured clients can coexist in one process.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use plugwire_api::{DEFAULT_PORT, TransportConfig, TransportKind};

use crate::model::DeviceKind;

/// Per-call overrides layered on top of a device's defaults.
///
/// `None` fields fall through to the next layer
/// (call → device → client).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub transport: Option<TransportKind>,
    pub timeout: Option<Duration>,
}

impl SendOptions {
    pub fn udp() -> Self {
        Self {
            transport: Some(TransportKind::Udp),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overlay `self` onto `base`; fields set here win.
    pub fn merge(self, base: SendOptions) -> SendOptions {
        SendOptions {
            transport: self.transport.or(base.transport),
            timeout: self.timeout.or(base.timeout),
        }
    }

    /// Resolve into a concrete transport configuration.
    pub fn apply(self, base: TransportConfig) -> TransportConfig {
        let mut config = base;
        if let Some(kind) = self.transport {
            config.kind = kind;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        config
    }
}

/// Client-wide defaults, passed to [`Client::new`](crate::Client::new).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Transport used when neither the device nor the call overrides it.
    pub transport: TransportConfig,
    /// Port for devices created without an explicit one.
    pub default_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            default_port: DEFAULT_PORT,
        }
    }
}

impl ClientConfig {
    pub fn with_send_options(mut self, options: SendOptions) -> Self {
        self.transport = options.apply(self.transport);
        self
    }
}

/// A device probed by unicast in addition to the broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryTarget {
    pub host: String,
    pub port: Option<u16>,
}

impl DiscoveryTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
        }
    }
}

/// Tuning for one discovery session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Local address for the shared UDP socket (port 0 = ephemeral).
    pub bind_address: SocketAddr,
    /// Broadcast (or unicast) address the probe is sent to each cycle.
    pub broadcast: Ipv4Addr,
    pub broadcast_port: u16,
    /// Time between probe cycles.
    pub interval: Duration,
    /// Stop the session automatically after this long. Zero = never.
    pub timeout: Duration,
    /// Consecutive unanswered cycles before a device is marked offline.
    pub offline_tolerance: u64,
    /// Only register devices of these kinds. `None` = all kinds.
    pub device_types: Option<Vec<DeviceKind>>,
    /// Allow-list of MAC glob patterns. Empty = allow all.
    pub mac_addresses: Vec<String>,
    /// Deny-list of MAC glob patterns.
    pub exclude_mac_addresses: Vec<String>,
    /// Extra unicast probes for devices unreachable by broadcast.
    pub targets: Vec<DiscoveryTarget>,
    /// Register one device per child outlet of multi-outlet units.
    pub break_out_children: bool,
    /// Send defaults for devices created by discovery.
    pub device_options: SendOptions,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            broadcast: Ipv4Addr::BROADCAST,
            broadcast_port: DEFAULT_PORT,
            interval: Duration::from_secs(10),
            timeout: Duration::ZERO,
            offline_tolerance: 3,
            device_types: None,
            mac_addresses: Vec::new(),
            exclude_mac_addresses: Vec::new(),
            targets: Vec::new(),
            break_out_children: true,
            device_options: SendOptions::default(),
        }
    }
}

impl DiscoveryOptions {
    pub fn broadcast_target(&self) -> SocketAddr {
        SocketAddr::from((self.broadcast, self.broadcast_port))
    }
}
