// ── Device classification ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Device class derived from the descriptor's `type` / `mic_type` field.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceKind {
    /// Smart plugs, power strips and wall switches (relay based).
    Plug,
    /// Smart bulbs and light strips.
    Bulb,
    /// Anything else; only the common system commands are available.
    #[default]
    #[serde(rename = "device")]
    #[strum(serialize = "device")]
    Generic,
}

impl DeviceKind {
    /// Classify a raw type string such as `IOT.SMARTPLUGSWITCH`.
    pub fn from_type_str(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.contains("plug") {
            Self::Plug
        } else if lower.contains("bulb") {
            Self::Bulb
        } else {
            Self::Generic
        }
    }

    /// Module names used to address this class of device.
    pub fn api_modules(self) -> &'static ApiModules {
        match self {
            Self::Bulb => &BULB_MODULES,
            Self::Plug | Self::Generic => &PLUG_MODULES,
        }
    }
}

/// Per-class module names. Bulbs namespace everything under `smartlife.iot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiModules {
    pub system: &'static str,
    pub cloud: &'static str,
    pub emeter: &'static str,
    pub schedule: &'static str,
    pub timesetting: &'static str,
    /// Only present on bulbs.
    pub lightingservice: Option<&'static str>,
}

const PLUG_MODULES: ApiModules = ApiModules {
    system: "system",
    cloud: "cnCloud",
    emeter: "emeter",
    schedule: "schedule",
    timesetting: "time",
    lightingservice: None,
};

const BULB_MODULES: ApiModules = ApiModules {
    system: "smartlife.iot.common.system",
    cloud: "smartlife.iot.common.cloud",
    emeter: "smartlife.iot.common.emeter",
    schedule: "smartlife.iot.common.schedule",
    timesetting: "smartlife.iot.common.timesetting",
    lightingservice: Some("smartlife.iot.smartbulb.lightingservice"),
};
