//! Centralized per-paper filesystem layout.
//!
//! Replaces the string-concatenation-across-many-files pattern in the source with a
//! single helper that every component accepts a handle to, rather than raw paths.

use std::path::{Path, PathBuf};

/// The on-disk layout for one paper's artifacts, rooted at
/// `<data_root>/paper_analyze/<paper_id>/`.
#[derive(Debug, Clone)]
pub struct PaperDir {
    root: PathBuf,
    paper_id: String,
}

impl PaperDir {
    pub fn new(data_root: impl AsRef<Path>, paper_id: impl Into<String>) -> Self {
        let paper_id = paper_id.into();
        let root = data_root.as_ref().join("paper_analyze").join(&paper_id);
        Self { root, paper_id }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.root.join(format!("{}.pdf", self.paper_id))
    }

    pub fn fast_ocr_path(&self) -> PathBuf {
        self.root.join(format!("{}_ocr.txt", self.paper_id))
    }

    pub fn structured_ocr_path(&self) -> PathBuf {
        self.root.join(format!("{}_paddleocr.md", self.paper_id))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("imgs")
    }

    pub fn image_path(&self, name: &str) -> PathBuf {
        self.images_dir().join(name)
    }

    pub fn analysis_path(&self) -> PathBuf {
        self.root.join(format!("{}_analysis.md", self.paper_id))
    }

    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::create_dir_all(self.images_dir()).await?;
        Ok(())
    }

    /// Remove all persisted artifacts for this paper. Used by the orchestrator's
    /// cleanup path for records that were discarded rather than persisted.
    pub async fn remove_all(&self) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_contract() {
        let dir = PaperDir::new("/data", "2401.00001");
        assert_eq!(
            dir.pdf_path(),
            PathBuf::from("/data/paper_analyze/2401.00001/2401.00001.pdf")
        );
        assert_eq!(
            dir.analysis_path(),
            PathBuf::from("/data/paper_analyze/2401.00001/2401.00001_analysis.md")
        );
        assert_eq!(
            dir.image_path("fig1.png"),
            PathBuf::from("/data/paper_analyze/2401.00001/imgs/fig1.png")
        );
    }
}
