//! Index Client (C2): query the remote preprint index, normalize entries.

mod feed;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::SearchMode;
use crate::error::{Error, Result};
use crate::models::PaperRecord;

pub use feed::{AtomEntry, AtomFeed};

/// Abstraction over the remote preprint index so tests can substitute a canned feed
/// without a network call.
#[async_trait]
pub trait IndexClient: Send + Sync {
    async fn search(
        &self,
        query: &str,
        mode: &SearchMode,
        limit: usize,
    ) -> Result<Vec<PaperRecord>>;
}

/// `reqwest`-backed client against a documented Atom-like query endpoint.
pub struct HttpIndexClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpIndexClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    fn build_query(&self, query: &str, mode: &SearchMode, limit: usize) -> Vec<(String, String)> {
        let search_query = match mode {
            SearchMode::DateRange {
                start_year,
                end_year,
            } => format!(
                "{query} AND submittedDate:[{start_year}0101* TO {end_year}1231*]"
            ),
            SearchMode::AfterYear { year } => {
                format!("{query} AND submittedDate:[{year}0101* TO 99991231*]")
            }
            SearchMode::Latest | SearchMode::MostRelevant | SearchMode::RecentlyUpdated => {
                query.to_string()
            }
        };

        let sort_by = if matches!(mode, SearchMode::RecentlyUpdated) {
            "lastUpdatedDate"
        } else {
            "relevance"
        }
        .to_string();
        let sort_order = "descending".to_string();

        vec![
            ("search_query".to_string(), search_query),
            ("start".to_string(), "0".to_string()),
            ("max_results".to_string(), limit.min(2000).to_string()),
            ("sortBy".to_string(), sort_by),
            ("sortOrder".to_string(), sort_order),
        ]
    }
}

#[async_trait]
impl IndexClient for HttpIndexClient {
    async fn search(
        &self,
        query: &str,
        mode: &SearchMode,
        limit: usize,
    ) -> Result<Vec<PaperRecord>> {
        let params = self.build_query(query, mode, limit);

        let response = tokio::time::timeout(
            self.timeout,
            self.client.get(&self.endpoint).query(&params).send(),
        )
        .await
        .map_err(|_| Error::IndexUnavailable("index request timed out".to_string()))?
        .map_err(|e| Error::IndexUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::IndexUnavailable(format!(
                "index returned HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?;

        let feed: AtomFeed = quick_xml::de::from_str(&body)
            .map_err(|e| Error::IndexUnavailable(format!("malformed feed: {e}")))?;

        Ok(feed
            .entries
            .into_iter()
            .take(limit)
            .map(entry_to_record)
            .collect())
    }
}

fn entry_to_record(entry: AtomEntry) -> PaperRecord {
    let paper_id = entry.paper_id();
    let pdf_url = entry.pdf_link().unwrap_or_default();
    let published_date: Option<DateTime<Utc>> = entry
        .published
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let mut record = PaperRecord::new(paper_id, entry.title.trim(), entry.summary.trim(), pdf_url);
    record.categories = entry.primary_category_and_tags();
    record.authors = entry.authors.iter().map(|a| a.name.clone()).collect();
    record.published_date = published_date;
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paper_id_is_final_path_segment() {
        let entry = AtomEntry {
            id: "https://export.arxiv.org/abs/2401.00001v2".to_string(),
            title: "t".to_string(),
            summary: "s".to_string(),
            published: None,
            authors: vec![],
            categories: vec![],
            links: vec![],
        };
        assert_eq!(entry.paper_id(), "2401.00001v2");
    }

    #[test]
    fn date_range_query_matches_documented_syntax() {
        let client = HttpIndexClient::new("https://example.test/query", Duration::from_secs(30));
        let params = client.build_query(
            "cat:cs.LG",
            &SearchMode::DateRange {
                start_year: 2023,
                end_year: 2024,
            },
            50,
        );
        let search_query = &params[0].1;
        assert_eq!(
            search_query,
            "cat:cs.LG AND submittedDate:[20230101* TO 20241231*]"
        );
    }
}
