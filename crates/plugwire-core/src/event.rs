// ── Change notifications ──
//
// Devices and discovery sessions publish on `broadcast` channels. Sends
// with no subscribers are dropped silently.

use std::sync::Arc;

use crate::device::Device;
use crate::error::CoreError;
use crate::model::{LightState, Realtime};

/// Emitted by a single [`Device`] when its cached state is refreshed.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    // ── Relay (plugs) ──
    /// Relay went from off (or unknown) to on.
    PowerOn,
    /// Relay went from on (or unknown) to off.
    PowerOff,
    /// Relay state was read or written, changed or not.
    PowerUpdate { on: bool },

    // ── Lighting (bulbs) ──
    LightStateOn(LightState),
    LightStateOff(LightState),
    /// Some field of the light state differs from the cached value.
    LightStateChange(LightState),
    /// Light state was read or written, changed or not.
    LightStateUpdate(LightState),

    // ── Metering ──
    EmeterRealtimeUpdate(Realtime),

    // ── Polling ──
    /// A polling cycle failed. Polling continues.
    PollingError(Arc<CoreError>),
}

/// Emitted by a discovery session.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// First reply from a device not yet in the registry.
    DeviceNew(Device),
    /// Reply from a known device. Address and descriptor were refreshed.
    DeviceOnline(Device),
    /// Missed enough consecutive cycles to be considered gone.
    DeviceOffline(Device),
    /// The discovery socket failed; the session has ended.
    Error(Arc<CoreError>),
}

impl DiscoveryEvent {
    pub fn device(&self) -> Option<&Device> {
        match self {
            Self::DeviceNew(d) | Self::DeviceOnline(d) | Self::DeviceOffline(d) => Some(d),
            Self::Error(_) => None,
        }
    }
}
