//! Compose-document merging and required-key filtering.
//!
//! Applications often split their compose configuration across a base file and
//! one or more overrides. The audit folds them into a single document with a
//! pure recursive merge and then reports the services missing required keys.

use std::collections::BTreeMap;

use serde_yaml::Value;

/// Recursively merge two YAML documents into a new one.
///
/// Mappings merge key-wise; on any other collision the overlay wins. Neither
/// input is modified, so the same sub-document can safely be merged from
/// multiple sources.
pub fn merge_values(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(a), Value::Mapping(b)) => {
            let mut merged = a.clone();
            for (key, value) in b {
                let combined = match a.get(key) {
                    Some(existing) => merge_values(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), combined);
            }
            Value::Mapping(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// For each required key, the services in the merged compose document that do
/// not carry it.
///
/// Services whose value is not a mapping are warned about and skipped; a
/// document without a `services` section reports every key as fully present.
pub fn services_missing_keys(
    config: &Value,
    required: &[String],
) -> BTreeMap<String, Vec<String>> {
    let mut missing: BTreeMap<String, Vec<String>> =
        required.iter().map(|key| (key.clone(), Vec::new())).collect();

    let services = match config.get("services").and_then(Value::as_mapping) {
        Some(services) => services,
        None => return missing,
    };

    for (service, body) in services {
        let service = match service.as_str() {
            Some(service) => service,
            None => continue,
        };
        let body = match body.as_mapping() {
            Some(body) => body,
            None => {
                tracing::warn!(
                    "Service {} is part of the compose document but has no attached keys",
                    service
                );
                continue;
            }
        };

        for key in required {
            if !body.contains_key(key.as_str()) {
                if let Some(entries) = missing.get_mut(key) {
                    entries.push(service.to_string());
                }
            }
        }
    }

    missing
}
