// ── Child-unit addressing ──
//
// Multi-outlet units address outlets by `<deviceId><NN>`. Callers may pass
// just the suffix; it is expanded against the parent's id here.

use serde_json::{Value, json};

use crate::error::CoreError;

/// Expand a short outlet suffix into a full child id.
///
/// Length 1 is zero-padded (`"1"` → `"<id>01"`), length 2 is appended
/// (`"01"` → `"<id>01"`), anything longer is already a full id.
pub fn normalize_child_id(device_id: Option<&str>, child_id: &str) -> Result<String, CoreError> {
    let short = match child_id.len() {
        0 => {
            return Err(CoreError::Addressing {
                child_id: String::new(),
                reason: "child id is empty".into(),
            });
        }
        1 => format!("0{child_id}"),
        2 => child_id.to_owned(),
        _ => return Ok(child_id.to_owned()),
    };

    match device_id {
        Some(id) if !id.is_empty() => Ok(format!("{id}{short}")),
        _ => Err(CoreError::Addressing {
            child_id: child_id.to_owned(),
            reason: "short child id needs the parent device id; fetch sysinfo first".into(),
        }),
    }
}

/// Add `context.child_ids` to a command envelope.
pub(crate) fn attach_child_ids(command: &mut Value, child_ids: Vec<String>) {
    if let Value::Object(map) = command {
        map.insert("context".into(), json!({ "child_ids": child_ids }));
    }
}
