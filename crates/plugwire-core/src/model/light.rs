// ── Bulb light state ──

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Cached `lightingservice` state. Compared by value for change detection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    #[serde(default)]
    pub on_off: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// State the bulb returns to when switched on; present while off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dft_on_state: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LightState {
    pub fn is_on(&self) -> bool {
        self.on_off == 1
    }
}

/// Parameters for `transition_light_state`. Unset fields are left alone
/// on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightStateInput {
    pub transition_period: Option<u32>,
    pub on_off: Option<bool>,
    pub mode: Option<String>,
    /// 0-360
    pub hue: Option<u16>,
    /// 0-100
    pub saturation: Option<u8>,
    /// 0-100
    pub brightness: Option<u8>,
    /// Kelvin
    pub color_temp: Option<u16>,
    pub ignore_default: bool,
}

impl Default for LightStateInput {
    fn default() -> Self {
        Self {
            transition_period: None,
            on_off: None,
            mode: None,
            hue: None,
            saturation: None,
            brightness: None,
            color_temp: None,
            ignore_default: true,
        }
    }
}

impl LightStateInput {
    pub fn power(on: bool) -> Self {
        Self {
            on_off: Some(on),
            ..Self::default()
        }
    }

    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn with_transition(mut self, period_ms: u32) -> Self {
        self.transition_period = Some(period_ms);
        self
    }

    /// Wire parameters; booleans are encoded as 0/1.
    pub fn to_params(&self) -> Value {
        let mut params = Map::new();
        params.insert("ignore_default".into(), json!(u8::from(self.ignore_default)));
        if let Some(v) = self.transition_period {
            params.insert("transition_period".into(), json!(v));
        }
        if let Some(v) = self.on_off {
            params.insert("on_off".into(), json!(u8::from(v)));
        }
        if let Some(v) = &self.mode {
            params.insert("mode".into(), json!(v));
        }
        if let Some(v) = self.hue {
            params.insert("hue".into(), json!(v));
        }
        if let Some(v) = self.saturation {
            params.insert("saturation".into(), json!(v));
        }
        if let Some(v) = self.brightness {
            params.insert("brightness".into(), json!(v));
        }
        if let Some(v) = self.color_temp {
            params.insert("color_temp".into(), json!(v));
        }
        Value::Object(params)
    }
}
