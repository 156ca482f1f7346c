//! Domain types shared across pipeline stages.

pub mod paper;
pub mod stored_paper;

pub use paper::PaperRecord;
pub use stored_paper::{DeepAnalysisStatus, ProcessingStatus, StoredPaper};
