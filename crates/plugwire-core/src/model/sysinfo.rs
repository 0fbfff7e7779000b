// ── Device descriptor ──
//
// The `system.get_sysinfo` result. Field coverage differs per firmware,
// so only the identifying fields are required; everything else is
// optional and unknown keys are preserved in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{DeviceKind, LightState, MacAddress};
use crate::protocol::normalize_child_id;

/// Device-reported descriptor ("sysinfo").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SysInfo {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub alias: String,
    pub model: String,
    pub sw_ver: String,
    pub hw_ver: String,

    /// Class discriminant on plugs (`IOT.SMARTPLUGSWITCH`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    /// Class discriminant on bulbs (`IOT.SMARTBULB`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mic_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mic_mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethernet_mac: Option<String>,

    /// Colon-separated capability list, e.g. `TIM:ENE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // ── Plug state ──
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_state: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ChildInfo>>,

    // ── Bulb state ──
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_state: Option<LightState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_dimmable: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_color: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_variable_color_temp: Option<u8>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One outlet of a multi-outlet unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildInfo {
    pub id: String,
    #[serde(default)]
    pub state: u8,
    #[serde(default)]
    pub alias: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SysInfo {
    pub fn kind(&self) -> DeviceKind {
        self.device_type
            .as_deref()
            .or(self.mic_type.as_deref())
            .map_or(DeviceKind::Generic, DeviceKind::from_type_str)
    }

    /// First non-empty of `mac`, `mic_mac`, `ethernet_mac`, normalized.
    pub fn mac_address(&self) -> MacAddress {
        [&self.mac, &self.mic_mac, &self.ethernet_mac]
            .into_iter()
            .flatten()
            .find(|m| !m.is_empty())
            .map(MacAddress::new)
            .unwrap_or_default()
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.feature.as_deref().is_some_and(|f| f.contains(feature))
    }

    pub fn supports_emeter(&self) -> bool {
        self.has_feature("ENE")
    }

    /// Look up a child outlet by its full id. Outlets reported with a
    /// short id are matched after expansion.
    pub fn child(&self, full_id: &str) -> Option<&ChildInfo> {
        let parent = &self.device_id;
        self.children
            .as_ref()?
            .iter()
            .find(|c| child_matches(parent, &c.id, full_id))
    }

    pub(crate) fn child_mut(&mut self, full_id: &str) -> Option<&mut ChildInfo> {
        let parent = &self.device_id;
        self.children
            .as_mut()?
            .iter_mut()
            .find(|c| child_matches(parent, &c.id, full_id))
    }
}

fn child_matches(parent: &str, reported: &str, full_id: &str) -> bool {
    reported == full_id
        || normalize_child_id(Some(parent), reported).is_ok_and(|id| id == full_id)
}
