// ── Command protocol ──
//
// Envelopes are `{ module: { operation: params } }` JSON objects with an
// optional `context.child_ids` for multi-outlet units. This module builds
// and parses them; `Device::send_command` ties it to a transport.

mod child_id;
mod response;

pub use child_id::normalize_child_id;
pub(crate) use child_id::attach_child_ids;
pub use response::{process_response, validate_command};

use serde_json::Value;

use crate::error::CoreError;

/// Read the device descriptor.
pub const GET_SYSINFO: &str = r#"{"system":{"get_sysinfo":{}}}"#;

/// Broadcast by discovery: descriptor plus live metering for both the
/// plug and bulb emeter modules. Unsupported modules answer with an error
/// code, which discovery ignores.
pub const DISCOVERY_PROBE: &str = r#"{"system":{"get_sysinfo":{}},"emeter":{"get_realtime":{}},"smartlife.iot.common.emeter":{"get_realtime":{}}}"#;

/// Parse a command given as text. The envelope must name at least one
/// module operation; see [`validate_command`].
pub fn parse_command(text: &str) -> Result<Value, CoreError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CoreError::InvalidCommand {
        reason: e.to_string(),
    })?;
    validate_command(&value)?;
    Ok(value)
}

/// Parse decoded reply text into an envelope.
pub fn parse_response(text: &str) -> Result<Value, CoreError> {
    serde_json::from_str(text).map_err(|e| CoreError::Decode {
        message: format!("reply is not valid JSON: {e}"),
        body: text.to_owned(),
    })
}

/// Build `{ module: { op: params } }`.
pub fn envelope(module: &str, op: &str, params: Value) -> Value {
    let mut ops = serde_json::Map::new();
    ops.insert(op.to_owned(), params);
    let mut modules = serde_json::Map::new();
    modules.insert(module.to_owned(), Value::Object(ops));
    Value::Object(modules)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_envelopes() {
        assert_eq!(
            envelope("system", "reboot", json!({ "delay": 1 })),
            json!({ "system": { "reboot": { "delay": 1 } } })
        );
    }

    #[test]
    fn probe_requests_sysinfo_and_both_emeters() {
        let probe: Value = serde_json::from_str(DISCOVERY_PROBE).unwrap();
        assert!(probe["system"]["get_sysinfo"].is_object());
        assert!(probe["emeter"]["get_realtime"].is_object());
        assert!(probe["smartlife.iot.common.emeter"]["get_realtime"].is_object());
    }

    #[test]
    fn rejects_non_object_commands() {
        assert!(parse_command("[1,2]").is_err());
        assert!(parse_command("{not json").is_err());
        assert!(parse_command(r#"{"system":{}}"#).is_err());
        assert!(parse_command(GET_SYSINFO).is_ok());
    }

    #[test]
    fn garbage_reply_is_decode_error() {
        assert!(matches!(
            parse_response("\u{1}garbage"),
            Err(CoreError::Decode { .. })
        ));
    }
}
