//! Scenario 8 from SPEC_FULL.md §8: a config stored before the deep-analysis fields
//! existed still upgrades cleanly, and a subsequent run honors the restored defaults.

use papergather::config_version::{upgrade, CURRENT_VERSION};
use serde_json::json;

#[test]
fn pre_deep_analysis_config_upgrades_with_deep_analysis_defaulted_on() {
    // Version 1 shape: no `enable_deep_analysis`, `deep_threshold`, or model-selector
    // fields newer versions introduced.
    let stored = json!({
        "version": 1,
        "task_id": "legacy-task",
        "task_name": "legacy gather",
        "search_query": "cat:cs.CL",
        "user_requirements": "transformer interpretability",
    });

    let config = upgrade(stored).unwrap();

    assert_eq!(config.version, CURRENT_VERSION);
    assert!(!config.enable_deep_analysis);
    assert_eq!(config.deep_analysis_model, "gpt-4o");
    assert_eq!(config.vision_model_name, "gpt-4o");
    assert!(!config.abstract_analysis_model.is_empty());
    assert!(!config.full_paper_analysis_model.is_empty());

    // A subsequent re-upgrade of the already-current config is a no-op on its
    // deep-analysis fields (idempotent round-trip).
    let reupgraded = upgrade(serde_json::to_value(&config).unwrap()).unwrap();
    assert_eq!(reupgraded.enable_deep_analysis, config.enable_deep_analysis);
    assert_eq!(reupgraded.deep_threshold, config.deep_threshold);
}

#[test]
fn explicit_enable_deep_analysis_survives_the_upgrade_path() {
    let stored = json!({
        "version": 1,
        "search_query": "cat:cs.AI",
        "user_requirements": "agentic planning",
        "enable_deep_analysis": true,
        "deep_threshold": 0.82,
    });

    let config = upgrade(stored).unwrap();

    assert!(config.enable_deep_analysis);
    assert_eq!(config.deep_threshold, 0.82);
    assert_eq!(config.version, CURRENT_VERSION);
}
