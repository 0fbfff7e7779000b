// ── Energy metering ──
//
// Firmware revisions disagree on units: older plugs report `power` in W,
// newer ones `power_mw` in mW. Both are kept; the accessors normalize.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `emeter.get_realtime` result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Realtime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_ma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_mv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_mw: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_wh: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Realtime {
    /// Watts.
    pub fn power_w(&self) -> Option<f64> {
        self.power.or(self.power_mw.map(|mw| mw / 1000.0))
    }

    /// Volts.
    pub fn voltage_v(&self) -> Option<f64> {
        self.voltage.or(self.voltage_mv.map(|mv| mv / 1000.0))
    }

    /// Amperes.
    pub fn current_a(&self) -> Option<f64> {
        self.current.or(self.current_ma.map(|ma| ma / 1000.0))
    }

    /// Kilowatt-hours.
    pub fn total_kwh(&self) -> Option<f64> {
        self.total.or(self.total_wh.map(|wh| wh / 1000.0))
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_milli_units() {
        let rt: Realtime = serde_json::from_value(json!({
            "power_mw": 12500, "voltage_mv": 120_000, "current_ma": 104, "total_wh": 3400, "err_code": 0
        }))
        .unwrap_or_default();

        assert_eq!(rt.power_w(), Some(12.5));
        assert_eq!(rt.voltage_v(), Some(120.0));
        assert_eq!(rt.total_kwh(), Some(3.4));
    }

    #[test]
    fn prefers_unit_fields_when_present() {
        let rt = Realtime {
            power: Some(7.0),
            power_mw: Some(9000.0),
            ..Realtime::default()
        };
        assert_eq!(rt.power_w(), Some(7.0));
        assert_eq!(rt.current_a(), None);
    }
}
