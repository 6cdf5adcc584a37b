//! Local book catalog loaded from a JSONL file.
//!
//! Each non-empty line holds one book:
//!
//! ```json
//! {"book_id": "14082-1", "book_title": "The Discovery of America", "book_Description": "..."}
//! ```
//!
//! An optional `content` field carries the readable text inline. Otherwise
//! content is read from `<content_dir>/<book_id>.txt` when a content
//! directory is configured. A file there with no catalog line is still
//! served, titled by its id.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chat_core::{BookContent, BookContentStore, BookSummary, CatalogSearch, ServiceError};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ToolError;

/// Maximum number of title search results.
const MAX_RESULTS: usize = 10;

#[derive(Debug, Deserialize)]
struct CatalogLine {
    book_id: String,
    book_title: String,
    #[serde(default, alias = "book_Description")]
    book_description: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    summary: BookSummary,
    title_lower: String,
    content: Option<String>,
}

/// In-memory catalog with title search and content lookup.
#[derive(Debug, Clone, Default)]
pub struct LocalCatalog {
    entries: Vec<CatalogEntry>,
    content_dir: Option<PathBuf>,
}

impl LocalCatalog {
    /// Parse catalog text. Blank lines are skipped; any malformed line fails
    /// the whole load.
    pub fn from_jsonl(text: &str) -> Result<Self, ToolError> {
        let mut entries = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parsed: CatalogLine =
                serde_json::from_str(line).map_err(|e| ToolError::Catalog {
                    line: idx + 1,
                    reason: e.to_string(),
                })?;
            entries.push(CatalogEntry {
                title_lower: parsed.book_title.to_lowercase(),
                summary: BookSummary {
                    book_id: parsed.book_id,
                    book_title: parsed.book_title,
                    book_description: parsed.book_description,
                },
                content: parsed.content,
            });
        }
        Ok(Self {
            entries,
            content_dir: None,
        })
    }

    /// Load a catalog file from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ToolError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_jsonl(&text)?;
        info!("Loaded {} books from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Read book text from `<dir>/<book_id>.txt` when not inline.
    pub fn with_content_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.content_dir = Some(dir.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find books whose title matches `title`.
    ///
    /// Case-insensitive substring matches come first, in catalog order.
    /// When there are none, titles are ranked by how many query words they
    /// share.
    pub fn search(&self, title: &str) -> Vec<BookSummary> {
        let needle = title.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let substring: Vec<BookSummary> = self
            .entries
            .iter()
            .filter(|entry| entry.title_lower.contains(&needle))
            .take(MAX_RESULTS)
            .map(|entry| entry.summary.clone())
            .collect();
        if !substring.is_empty() {
            return substring;
        }

        let tokens = tokenize(&needle);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, usize)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(idx, entry)| {
                let title_tokens = tokenize(&entry.title_lower);
                let score = tokens
                    .iter()
                    .filter(|token| title_tokens.contains(token))
                    .count();
                (score > 0).then_some((idx, score))
            })
            .collect();
        // Stable sort keeps catalog order among equal scores.
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        scored
            .into_iter()
            .take(MAX_RESULTS)
            .map(|(idx, _)| self.entries[idx].summary.clone())
            .collect()
    }

    fn find(&self, book_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.summary.book_id == book_id)
    }

    /// Look up a book with its content.
    pub async fn content(&self, book_id: &str) -> Result<Option<BookContent>, ToolError> {
        if !is_valid_book_id(book_id) {
            debug!("Rejecting malformed book id {:?}", book_id);
            return Ok(None);
        }
        let entry = self.find(book_id);

        let text = match (entry.and_then(|e| e.content.as_ref()), &self.content_dir) {
            (Some(inline), _) => inline.clone(),
            (None, Some(dir)) => match read_content_file(dir, book_id).await? {
                Some(text) => text,
                None => return Ok(None),
            },
            (None, None) => return Ok(None),
        };

        // Files without a catalog line are served under their id.
        let (book_title, book_description) = match entry {
            Some(entry) => (
                entry.summary.book_title.clone(),
                entry.summary.book_description.clone(),
            ),
            None => (book_id.to_string(), String::new()),
        };

        Ok(Some(BookContent {
            book_id: book_id.to_string(),
            book_title,
            book_description,
            book_content: text,
        }))
    }
}

async fn read_content_file(dir: &Path, book_id: &str) -> Result<Option<String>, ToolError> {
    let path = dir.join(format!("{}.txt", book_id));
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Book ids are restricted to `[A-Za-z0-9_-]` before touching the filesystem.
pub fn is_valid_book_id(book_id: &str) -> bool {
    !book_id.is_empty()
        && book_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() > 2)
        .map(|token| token.to_string())
        .collect()
}

#[async_trait]
impl CatalogSearch for LocalCatalog {
    async fn search_by_title(&self, title: &str) -> Result<Vec<BookSummary>, ServiceError> {
        Ok(self.search(title))
    }
}

#[async_trait]
impl BookContentStore for LocalCatalog {
    async fn fetch(&self, book_id: &str) -> Result<Option<BookContent>, ServiceError> {
        self.content(book_id).await.map_err(|e| match e {
            ToolError::Service(inner) => inner,
            other => ServiceError::Storage(other.to_string()),
        })
    }
}
