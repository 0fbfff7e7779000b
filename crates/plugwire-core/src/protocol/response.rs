// ── Response unwrapping and validation ──
//
// A reply mirrors the request envelope. Results are pulled out along the
// request's module/operation keys, and every extracted result must carry
// `err_code: 0`. Nested objects that carry their own `err_code` are
// checked too.

use serde_json::{Map, Value};

use crate::error::CoreError;

/// The `(module, operation)` pairs a command envelope requests.
pub(crate) fn operations(command: &Value) -> Vec<(&str, &str)> {
    let Some(modules) = command.as_object() else {
        return Vec::new();
    };
    modules
        .iter()
        .filter(|(module, _)| module.as_str() != "context")
        .filter_map(|(module, ops)| ops.as_object().map(|ops| (module, ops)))
        .flat_map(|(module, ops)| ops.keys().map(move |op| (module.as_str(), op.as_str())))
        .collect()
}

/// Check the shape of a command envelope: a JSON object whose modules
/// (other than `context`) are objects naming at least one operation.
pub fn validate_command(command: &Value) -> Result<(), CoreError> {
    let invalid = |reason: String| CoreError::InvalidCommand { reason };

    let Some(modules) = command.as_object() else {
        return Err(invalid("command must be a JSON object".into()));
    };
    for (module, ops) in modules.iter().filter(|(module, _)| module.as_str() != "context") {
        match ops.as_object() {
            Some(ops) if !ops.is_empty() => {}
            Some(_) => return Err(invalid(format!("module '{module}' names no operation"))),
            None => return Err(invalid(format!("module '{module}' must be an object"))),
        }
    }
    if operations(command).is_empty() {
        return Err(invalid("command names no operation".into()));
    }
    Ok(())
}

/// Extract and validate the results for `command` from `response`.
///
/// A single-operation command yields that operation's result object;
/// a batch yields an envelope with the same module/operation shape as
/// the request.
pub fn process_response(command: &Value, response: &Value) -> Result<Value, CoreError> {
    validate_command(command)?;
    let ops = operations(command);

    let mut errors = Vec::new();
    let mut extracted: Map<String, Value> = Map::new();

    for &(module, op) in &ops {
        let result = extract(response, module, op);
        match &result {
            Some(leaf) => collect_errors(leaf, true, &mut errors),
            None => errors.push(missing(module, op)),
        }

        let slot = extracted
            .entry(module.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(slot) = slot {
            slot.insert(op.to_owned(), result.cloned().unwrap_or(Value::Null));
        }
    }

    if !errors.is_empty() {
        return Err(CoreError::ResponseValidation {
            message: describe(&errors),
            errors,
            response: response.clone(),
        });
    }

    if let [(module, op)] = ops.as_slice() {
        return Ok(extracted
            .get(*module)
            .and_then(|m| m.get(*op))
            .cloned()
            .unwrap_or(Value::Null));
    }
    Ok(Value::Object(extracted))
}

/// Result for one operation. Unsupported modules answer at module level
/// (`{"emeter":{"err_code":-1,...}}`) without the operation key.
fn extract<'a>(response: &'a Value, module: &str, op: &str) -> Option<&'a Value> {
    let module_value = response.get(module)?;
    match module_value.get(op) {
        Some(result) => Some(result),
        None if module_value.get("err_code").is_some() => Some(module_value),
        None => None,
    }
}

fn collect_errors(value: &Value, required: bool, errors: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            match map.get("err_code") {
                Some(code) if code.as_i64() == Some(0) => {}
                None if !required => {}
                _ => {
                    errors.push(value.clone());
                    return;
                }
            }
            for child in map.values() {
                collect_errors(child, false, errors);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_errors(item, false, errors);
            }
        }
        _ if required => errors.push(value.clone()),
        _ => {}
    }
}

fn missing(module: &str, op: &str) -> Value {
    let mut ops = Map::new();
    ops.insert(op.to_owned(), Value::Null);
    let mut envelope = Map::new();
    envelope.insert(module.to_owned(), Value::Object(ops));
    Value::Object(envelope)
}

fn describe(errors: &[Value]) -> String {
    let first = errors.first();
    let code = first.and_then(|e| e.get("err_code"));
    let msg = first.and_then(|e| e.get("err_msg")).and_then(Value::as_str);
    let detail = match (code, msg) {
        (Some(code), Some(msg)) => format!("err_code {code}: {msg}"),
        (Some(code), None) => format!("err_code {code}"),
        (None, _) => "err_code missing".to_owned(),
    };
    if errors.len() > 1 {
        format!("{detail} (and {} more)", errors.len() - 1)
    } else {
        detail
    }
}
