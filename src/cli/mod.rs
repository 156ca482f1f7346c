//! CLI surface: register/trigger/cancel tasks, run the scheduler+API server, or
//! reanalyze a single paper, all against the same [`crate::config::Settings`].

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "gather", version, about = "Automated research-paper acquisition and analysis pipeline")]
pub struct Cli {
    /// Increase logging verbosity; repeat for more (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Decrease logging verbosity.
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a settings file (JSON/TOML/YAML). Falls back to built-in defaults.
    #[arg(long, env = "PAPERGATHER_SETTINGS")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the scheduler and control API in the foreground.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,
    },
    /// Register a task from a JSON config file and exit.
    RegisterTask {
        #[arg(long)]
        config: PathBuf,
    },
    /// Trigger one immediate run of a registered task and print the summary.
    Trigger {
        task_id: String,
    },
    /// Request cancellation of a task's in-flight run.
    Cancel {
        task_id: String,
    },
    /// Re-run deep analysis for one already-persisted paper.
    AnalyzeSingle {
        paper_id: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        vision_model: Option<String>,
    },
    /// Save a task config as a named, reusable preset.
    SavePreset {
        name: String,
        #[arg(long)]
        config: PathBuf,
    },
    /// Print a previously saved preset.
    ShowPreset {
        name: String,
    },
    /// List the names of all saved presets.
    ListPresets,
}

impl Cli {
    pub fn verbosity(&self) -> i8 {
        if self.quiet {
            -1
        } else {
            self.verbose as i8
        }
    }

    pub fn load_settings(&self) -> Result<Settings> {
        match &self.settings {
            Some(path) => Settings::load_from_path(path),
            None => Ok(Settings::default()),
        }
    }
}

/// Construct the process-wide [`crate::orchestrator::PipelineContext`] from settings.
/// Backends for the out-of-scope external collaborators (OCR, LLM, index transport)
/// are left to the caller to wire in -- this crate only defines their seams.
pub async fn build_context(
    settings: &Settings,
    fetcher: Arc<dyn crate::fetcher::Fetcher>,
    extractor: crate::extractor::TextExtractor,
    scorer: crate::scorer::RelevanceScorer,
    analyzer: crate::analyzer::DeepAnalyzer,
) -> Result<Arc<crate::orchestrator::PipelineContext>> {
    settings.ensure_directories().await?;
    crate::store::run_pending_migrations(&settings.database_url()).await?;
    let store = Arc::new(crate::store::DieselPaperStore::from_database_url(
        &settings.database_url(),
    )?);

    Ok(Arc::new(crate::orchestrator::PipelineContext {
        fetcher,
        extractor: Arc::new(extractor),
        scorer: Arc::new(scorer),
        analyzer: Arc::new(analyzer),
        store,
        data_root: settings.data_dir.clone(),
        per_paper_wall_clock_secs: settings.per_paper_wall_clock_secs,
        max_paper_fanout: settings.max_paper_fanout,
    }))
}
