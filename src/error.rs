//! Crate-wide error taxonomy.
//!
//! Every stage of the pipeline maps its failures onto one of these kinds. Per-paper
//! kinds are caught by the orchestrator and folded into the run summary; only
//! [`Error::InvalidConfig`] and unrecoverable infrastructure failures are allowed to
//! bubble out of a run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The remote preprint index could not be reached or returned a transport error.
    /// Transient: the current run proceeds with zero candidates.
    #[error("preprint index unavailable: {0}")]
    IndexUnavailable(String),

    /// PDF download failed. Per-paper; the record is discarded, the run continues.
    #[error("fetch failed for {paper_id}: {detail}")]
    FetchFailed { paper_id: String, detail: String },

    /// Zero pages could be extracted in the attempted mode.
    #[error("OCR failed for {paper_id}: {detail}")]
    OcrFailed { paper_id: String, detail: String },

    /// The scorer could not produce a well-formed result.
    #[error("scoring failed for {paper_id}: {detail}")]
    ScoringFailed { paper_id: String, detail: String },

    /// The deep analyzer raised. The paper is still persisted with a failed status.
    #[error("deep analysis failed for {paper_id}: {detail}")]
    AnalysisFailed { paper_id: String, detail: String },

    /// A store write failed. Logged; the run continues.
    #[error("persist failed for {paper_id}: {detail}")]
    PersistFailed { paper_id: String, detail: String },

    /// The task configuration is malformed after upgrade. The run never starts.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The run was cancelled cooperatively.
    #[error("run cancelled")]
    Cancelled,

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("pool error: {0}")]
    Pool(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
