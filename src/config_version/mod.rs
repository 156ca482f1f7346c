//! Config Versioner (C11): upgrade-only, linear-path migration of stored configs.
//!
//! Grounded on the original's `ConfigVersionManager`: each released schema version
//! declares the fields it newly introduces and their defaults. `upgrade` computes the
//! path from a stored config's version to `CURRENT_VERSION`, fills in anything
//! missing or null along the way, then stamps the result with `CURRENT_VERSION`.

use serde_json::{json, Value};

use crate::config::{SearchMode, TaskConfig};
use crate::error::{Error, Result};

pub const CURRENT_VERSION: u32 = 3;

type DefaultFn = fn() -> Value;

/// One entry per released schema version, in ascending order. Mirrors the original's
/// three released versions: 1.0.0 (baseline), 1.1.0 (search mode fields), 1.2.0
/// (model selector fields).
const VERSION_DEFAULTS: &[(u32, &[(&str, DefaultFn)])] = &[
    (
        1,
        &[
            ("interval_seconds", || json!(3600)),
            ("search_query", || json!("")),
            ("max_hits_per_search", || json!(50)),
            ("user_requirements", || json!("")),
            ("persist_threshold", || json!(0.7)),
            ("deep_threshold", || json!(0.8)),
            ("enable_deep_analysis", || json!(false)),
            ("ocr_char_limit", || json!(8000)),
            ("deep_analysis_model", || json!("gpt-4o")),
            ("vision_model_name", || json!("gpt-4o")),
        ],
    ),
    (
        2,
        &[
            ("search_mode", || json!({"mode": "latest"})),
            ("start_year", || Value::Null),
            ("end_year", || Value::Null),
            ("after_year", || Value::Null),
        ],
    ),
    (
        3,
        &[
            ("abstract_analysis_model", || json!("gpt-4o-mini")),
            ("full_paper_analysis_model", || json!("gpt-4o-mini")),
            ("translation_model", || Value::Null),
        ],
    ),
];

/// Versions strictly greater than `from_version` up to and including
/// `CURRENT_VERSION`, matching the original's index-slice semantics for
/// `get_upgrade_path`.
fn get_upgrade_path(from_version: u32) -> Vec<u32> {
    VERSION_DEFAULTS
        .iter()
        .map(|(v, _)| *v)
        .filter(|v| *v > from_version && *v <= CURRENT_VERSION)
        .collect()
}

fn field_missing_or_null(obj: &serde_json::Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        None => true,
        Some(Value::Null) => true,
        Some(_) => false,
    }
}

/// Re-hydrate a legacy string-encoded `search_mode` (or an absent one) into the
/// closed tagged variant. Falls back to `Latest` on any unrecognized value, matching
/// the original's fallback-to-LATEST behavior.
fn rehydrate_search_mode(obj: &mut serde_json::Map<String, Value>) {
    let needs_rehydration = matches!(obj.get("search_mode"), Some(Value::String(_)) | None);
    if !needs_rehydration {
        return;
    }

    let legacy = obj
        .get("search_mode")
        .and_then(|v| v.as_str())
        .unwrap_or("latest");

    let mode = match legacy {
        "latest" => json!({"mode": "latest"}),
        "most_relevant" => json!({"mode": "most_relevant"}),
        "recently_updated" => json!({"mode": "recently_updated"}),
        "date_range" => {
            let start_year = obj.get("start_year").and_then(|v| v.as_i64());
            let end_year = obj.get("end_year").and_then(|v| v.as_i64());
            match (start_year, end_year) {
                (Some(start), Some(end)) => json!({
                    "mode": "date_range",
                    "start_year": start,
                    "end_year": end,
                }),
                _ => json!({"mode": "latest"}),
            }
        }
        "after_year" => match obj.get("after_year").and_then(|v| v.as_i64()) {
            Some(year) => json!({"mode": "after_year", "year": year}),
            None => json!({"mode": "latest"}),
        },
        _ => json!({"mode": "latest"}),
    };

    obj.insert("search_mode".to_string(), mode);
}

/// Apply every version step's defaults for fields missing or null in `stored`, then
/// stamp `version = CURRENT_VERSION`. Unknown/unparseable stored versions are treated
/// as version 0 (upgrade from scratch using all defaults).
pub fn upgrade(stored: Value) -> Result<TaskConfig> {
    let mut obj = match stored {
        Value::Object(o) => o,
        _ => serde_json::Map::new(),
    };

    let from_version = obj
        .get("version")
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .unwrap_or(0);

    for version in get_upgrade_path(from_version) {
        let defaults = VERSION_DEFAULTS
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, d)| *d)
            .unwrap_or(&[]);
        for (key, default_fn) in defaults {
            if field_missing_or_null(&obj, key) {
                obj.insert(key.to_string(), default_fn());
            }
        }
    }

    rehydrate_search_mode(&mut obj);
    obj.insert("version".to_string(), json!(CURRENT_VERSION));

    if !obj.contains_key("task_name") {
        obj.insert("task_name".to_string(), json!("unnamed-task"));
    }
    if !obj.contains_key("task_id") {
        obj.insert(
            "task_id".to_string(),
            json!(uuid::Uuid::new_v4().to_string()),
        );
    }

    let config: TaskConfig = serde_json::from_value(Value::Object(obj))
        .map_err(|e| Error::InvalidConfig(format!("config upgrade produced invalid shape: {e}")))?;

    config.validate()?;

    Ok(config)
}
