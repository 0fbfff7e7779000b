// ── Domain model ──
//
// Typed views over device-reported JSON.

mod emeter;
mod kind;
mod light;
mod mac;
mod sysinfo;

pub use emeter::Realtime;
pub use kind::{ApiModules, DeviceKind};
pub use light::{LightState, LightStateInput};
pub use mac::MacAddress;
pub use sysinfo::{ChildInfo, SysInfo};

use serde::{Deserialize, Serialize};
use strum::Display;

/// Presence as tracked by discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceStatus {
    /// Never seen by a discovery session.
    #[default]
    Unknown,
    Online,
    Offline,
}

impl DeviceStatus {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}
