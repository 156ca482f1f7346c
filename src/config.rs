//! Process-wide settings and the per-task configuration schema.
//!
//! `Settings` covers the process (data directory, database URL, default timeouts);
//! `TaskConfig` covers one gather task and is versioned by [`crate::config_version`].
//! Precedence for `Settings` matches the teacher's `config.rs`: CLI flag >
//! `PAPERGATHER_*` env > config file > built-in default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Closed tagged variant for the preprint index search mode. Replaces the
/// string-plus-optional-fields pattern with a schema that cannot represent an
/// invalid combination (e.g. `DateRange` without both years).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchMode {
    Latest,
    MostRelevant,
    RecentlyUpdated,
    DateRange { start_year: i32, end_year: i32 },
    AfterYear { year: i32 },
}

impl SearchMode {
    pub fn validate(&self) -> Result<()> {
        match self {
            SearchMode::DateRange {
                start_year,
                end_year,
            } => {
                if start_year > end_year {
                    return Err(Error::InvalidConfig(format!(
                        "date_range: start_year ({start_year}) must be <= end_year ({end_year})"
                    )));
                }
                Ok(())
            }
            SearchMode::AfterYear { year } => {
                if *year < 1990 {
                    return Err(Error::InvalidConfig(format!(
                        "after_year: implausible year {year}"
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Fallback used by the config versioner when a stored mode string is
    /// unrecognized.
    pub fn fallback() -> Self {
        SearchMode::Latest
    }
}

/// Immutable-for-one-run task configuration. Constructed by the API or loaded from
/// the history store, always via [`crate::config_version::upgrade`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub task_name: String,
    pub task_id: String,
    pub version: u32,

    pub interval_seconds: u64,
    pub search_query: String,
    pub max_hits_per_search: usize,
    #[serde(alias = "requirements_text")]
    pub user_requirements: String,

    pub abstract_analysis_model: String,
    pub full_paper_analysis_model: String,
    pub deep_analysis_model: String,
    pub vision_model_name: String,
    /// Carried for lossless round-trip with pre-existing history shards; unused by
    /// any in-scope pipeline stage.
    pub translation_model: Option<String>,

    pub persist_threshold: f64,
    pub deep_threshold: f64,
    pub enable_deep_analysis: bool,
    pub ocr_char_limit: usize,

    pub search_mode: SearchMode,
}

impl TaskConfig {
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.search_query.trim().is_empty() {
            missing.push("search_query");
        }
        if self.user_requirements.trim().is_empty() {
            missing.push("user_requirements");
        }
        if self.abstract_analysis_model.trim().is_empty() {
            missing.push("abstract_analysis_model");
        }
        if self.full_paper_analysis_model.trim().is_empty() {
            missing.push("full_paper_analysis_model");
        }
        if self.deep_analysis_model.trim().is_empty() {
            missing.push("deep_analysis_model");
        }
        if !missing.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        self.search_mode.validate()?;
        Ok(())
    }
}

/// A single keyed record holding default model selectors and thresholds. Fetched and
/// persisted atomically through the same pool as the Paper Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub default_abstract_model: String,
    pub default_full_paper_model: String,
    pub default_deep_analysis_model: String,
    pub default_vision_model: String,
    pub default_persist_threshold: f64,
    pub default_deep_threshold: f64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            default_abstract_model: "gpt-4o-mini".to_string(),
            default_full_paper_model: "gpt-4o-mini".to_string(),
            default_deep_analysis_model: "gpt-4o".to_string(),
            default_vision_model: "gpt-4o".to_string(),
            default_persist_threshold: 0.7,
            default_deep_threshold: 0.8,
        }
    }
}

/// Process-wide settings, not versioned (unlike `TaskConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub database_filename: String,
    pub request_timeout_secs: u64,
    pub index_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub ocr_timeout_secs: u64,
    pub scorer_timeout_secs: u64,
    pub analyzer_timeout_secs: u64,
    pub per_paper_wall_clock_secs: u64,
    pub max_paper_fanout: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            database_filename: "papergather.sqlite3".to_string(),
            request_timeout_secs: 30,
            index_timeout_secs: 30,
            fetch_timeout_secs: 120,
            ocr_timeout_secs: 600,
            scorer_timeout_secs: 120,
            analyzer_timeout_secs: 600,
            per_paper_wall_clock_secs: 1200,
            max_paper_fanout: 1,
        }
    }
}

impl Settings {
    pub fn database_url(&self) -> String {
        format!(
            "sqlite://{}",
            self.data_dir.join(&self.database_filename).display()
        )
    }

    pub fn history_dir(&self) -> PathBuf {
        self.data_dir.join("task_history")
    }

    pub fn config_presets_dir(&self) -> PathBuf {
        self.data_dir.join("config_presets")
    }

    pub async fn ensure_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        tokio::fs::create_dir_all(self.history_dir()).await?;
        tokio::fs::create_dir_all(self.config_presets_dir()).await?;
        Ok(())
    }

    /// Load from a JSON/TOML/YAML file, dispatched by extension, matching the
    /// teacher's `load_from_path`.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let settings = match ext {
            "toml" => toml::from_str(&raw)
                .map_err(|e| Error::InvalidConfig(format!("invalid settings toml: {e}")))?,
            "yaml" | "yml" => serde_yaml::from_str(&raw)
                .map_err(|e| Error::InvalidConfig(format!("invalid settings yaml: {e}")))?,
            _ => serde_json::from_str(&raw)?,
        };
        Ok(settings)
    }
}
