//! Fetcher (C3): download PDF bytes with resumable local caching.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::models::PaperRecord;
use crate::paths::PaperDir;

#[derive(Debug, Clone)]
pub enum FetchProgress {
    Started { paper_id: String },
    Completed { paper_id: String, bytes: u64 },
    ReusedExisting { paper_id: String },
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        record: &PaperRecord,
        dest_dir: &PaperDir,
        reuse_existing: bool,
        progress: Option<&mpsc::Sender<FetchProgress>>,
    ) -> Result<Bytes>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        record: &PaperRecord,
        dest_dir: &PaperDir,
        reuse_existing: bool,
        progress: Option<&mpsc::Sender<FetchProgress>>,
    ) -> Result<Bytes> {
        if let Some(tx) = progress {
            let _ = tx
                .send(FetchProgress::Started {
                    paper_id: record.paper_id.clone(),
                })
                .await;
        }

        let pdf_path = dest_dir.pdf_path();

        if reuse_existing {
            if let Ok(metadata) = tokio::fs::metadata(&pdf_path).await {
                if metadata.len() > 0 {
                    let bytes = tokio::fs::read(&pdf_path).await.map_err(|e| {
                        Error::FetchFailed {
                            paper_id: record.paper_id.clone(),
                            detail: e.to_string(),
                        }
                    })?;
                    if let Some(tx) = progress {
                        let _ = tx
                            .send(FetchProgress::ReusedExisting {
                                paper_id: record.paper_id.clone(),
                            })
                            .await;
                    }
                    return Ok(Bytes::from(bytes));
                }
            }
        }

        let response = tokio::time::timeout(
            self.timeout,
            self.client.get(&record.pdf_url).send(),
        )
        .await
        .map_err(|_| Error::FetchFailed {
            paper_id: record.paper_id.clone(),
            detail: "fetch timed out".to_string(),
        })?
        .map_err(|e| Error::FetchFailed {
            paper_id: record.paper_id.clone(),
            detail: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(Error::FetchFailed {
                paper_id: record.paper_id.clone(),
                detail: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| Error::FetchFailed {
            paper_id: record.paper_id.clone(),
            detail: e.to_string(),
        })?;

        dest_dir.ensure_dirs().await.map_err(|e| Error::FetchFailed {
            paper_id: record.paper_id.clone(),
            detail: e.to_string(),
        })?;

        let mut file = tokio::fs::File::create(&pdf_path)
            .await
            .map_err(|e| Error::FetchFailed {
                paper_id: record.paper_id.clone(),
                detail: e.to_string(),
            })?;
        file.write_all(&bytes).await.map_err(|e| Error::FetchFailed {
            paper_id: record.paper_id.clone(),
            detail: e.to_string(),
        })?;

        if let Some(tx) = progress {
            let _ = tx
                .send(FetchProgress::Completed {
                    paper_id: record.paper_id.clone(),
                    bytes: bytes.len() as u64,
                })
                .await;
        }

        Ok(bytes)
    }
}
