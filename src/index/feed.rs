//! Atom-like feed deserialization for the remote preprint index.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AtomFeed {
    #[serde(rename = "entry", default)]
    pub entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AtomEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(rename = "author", default)]
    pub authors: Vec<AtomAuthor>,
    #[serde(rename = "category", default)]
    pub categories: Vec<AtomCategory>,
    #[serde(rename = "link", default)]
    pub links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
pub struct AtomAuthor {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AtomCategory {
    #[serde(rename = "@term")]
    pub term: String,
}

#[derive(Debug, Deserialize)]
pub struct AtomLink {
    #[serde(rename = "@href")]
    pub href: String,
    #[serde(rename = "@title", default)]
    pub title: Option<String>,
    #[serde(rename = "@rel", default)]
    pub rel: Option<String>,
}

impl AtomEntry {
    /// The stable identifier is the final path segment of the canonical URL.
    pub fn paper_id(&self) -> String {
        self.id
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.id)
            .to_string()
    }

    pub fn pdf_link(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| l.title.as_deref() == Some("pdf") || l.rel.as_deref() == Some("related"))
            .map(|l| l.href.clone())
            .or_else(|| self.links.first().map(|l| l.href.clone()))
    }

    pub fn primary_category_and_tags(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.term.clone()).collect()
    }
}
