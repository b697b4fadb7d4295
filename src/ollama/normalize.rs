//! Family field normalization
//!
//! `/api/show` reports architecture-specific fields under the model family's name,
//! e.g. `llama.context_length` or `phi3.embedding_length`. The family is read from
//! `details.family` first, then those keys are renamed to `model.*` so the payload
//! decodes into fixed field names.

use serde_json::{Map, Value};

use super::OllamaError;

/// Fields published under the family prefix
const FAMILY_FIELDS: [&str; 2] = ["context_length", "embedding_length"];

/// Family name from `details.family`, if present and non-empty
pub fn extract_family(payload: &Value) -> Option<String> {
    payload
        .get("details")?
        .get("family")?
        .as_str()
        .filter(|family| !family.is_empty())
        .map(str::to_string)
}

/// Parse a raw `/api/show` body and rename `<family>.*` keys to `model.*`
pub fn normalize_family_fields(raw: &str) -> Result<Value, OllamaError> {
    let mut payload: Value = serde_json::from_str(raw)
        .map_err(|e| OllamaError::Decode(format!("show response: {}", e)))?;

    let family = extract_family(&payload)
        .ok_or_else(|| OllamaError::Normalization("no family found".to_string()))?;

    let renames: Vec<(String, String)> = FAMILY_FIELDS
        .iter()
        .map(|field| (format!("{}.{}", family, field), format!("model.{}", field)))
        .collect();

    rename_keys(&mut payload, &renames);
    Ok(payload)
}

fn rename_keys(value: &mut Value, renames: &[(String, String)]) {
    match value {
        Value::Object(map) => {
            rename_in_map(map, renames);
            for child in map.values_mut() {
                rename_keys(child, renames);
            }
        }
        Value::Array(items) => {
            for item in items {
                rename_keys(item, renames);
            }
        }
        _ => {}
    }
}

fn rename_in_map(map: &mut Map<String, Value>, renames: &[(String, String)]) {
    for (from, to) in renames {
        if let Some(v) = map.remove(from) {
            map.insert(to.clone(), v);
        }
    }
}
