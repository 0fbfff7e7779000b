//! Command protocol, device model, and discovery engine for plugwire.
//!
//! Sits on top of `plugwire-api` (cipher and transports) and is consumed
//! by the CLI:
//!
//! - **[`Client`]**: cloneable facade holding the client configuration,
//!   the device registry, and at most one discovery session.
//!
//! - **[`Device`]**: cached descriptor plus derived attributes, the
//!   command protocol ([`Device::send_command`]), change notifications
//!   ([`DeviceEvent`]), and polling. Plug and bulb operations live on the
//!   [`Switch`] and [`Light`] views.
//!
//! - **Discovery**: periodic UDP probes, reply correlation, and
//!   cycle-counted offline detection, published as [`DiscoveryEvent`]s.
//!
//! - **[`DeviceStream`]**: reactive view of the registry with
//!   `current()` / `latest()` / `changed()`.
//!
//! Logging goes through `tracing`; with no subscriber installed it is a
//! no-op.

pub mod client;
pub mod config;
pub mod device;
pub mod discovery;
pub mod error;
pub mod event;
pub mod model;
pub mod protocol;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::Client;
pub use config::{ClientConfig, DiscoveryOptions, DiscoveryTarget, SendOptions};
pub use device::{Device, DeviceAddress, DeviceInfo, DeviceOptions, Light, PollingHandle, Switch};
pub use error::CoreError;
pub use event::{DeviceEvent, DiscoveryEvent};
pub use store::DeviceStream;

pub use model::{
    ApiModules, ChildInfo, DeviceKind, DeviceStatus, LightState, LightStateInput, MacAddress,
    Realtime, SysInfo,
};

pub use plugwire_api::{DEFAULT_PORT, TransportConfig, TransportKind};
