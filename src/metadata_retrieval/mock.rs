//! Mock metadata provider for testing.

use super::{
    CatalogCandidate, CatalogDetail, CatalogId, CatalogSummary, MetadataProvider,
    MetadataRetrievalError, StreamingEpisode,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory catalog returning every known anime for any search term.
#[derive(Debug, Default)]
pub(crate) struct MockCatalog {
    candidates: Vec<CatalogCandidate>,
    details: HashMap<CatalogId, CatalogDetail>,
    fail_search: bool,
    detail_calls: AtomicUsize,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a search candidate known by its title and the given alternate names
    pub fn with_anime(mut self, id: CatalogId, title: &str, alternate_names: &[&str]) -> Self {
        let keywords = std::iter::once(title)
            .chain(alternate_names.iter().copied())
            .map(str::to_string)
            .collect();

        self.candidates.push(CatalogCandidate {
            summary: CatalogSummary {
                id,
                title: title.to_string(),
                cover_image: Some(format!("https://img.example/{}.jpg", id)),
                year: Some(2013),
                average_score: Some(80),
            },
            keywords,
        });
        self
    }

    /// Registers a detail record whose streaming episodes are given newest first
    pub fn with_detail(mut self, id: CatalogId, streaming_episodes: &[(&str, &str)]) -> Self {
        self.details.insert(id, detail(id, streaming_episodes));
        self
    }

    /// Makes every search fail with a request error
    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    /// Number of detail lookups performed so far
    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }
}

/// Builds a detail record with the given streaming episodes
pub(crate) fn detail(id: CatalogId, streaming_episodes: &[(&str, &str)]) -> CatalogDetail {
    CatalogDetail {
        id,
        title: format!("Anime {}", id),
        status: None,
        description: String::new(),
        start_date: None,
        end_date: None,
        year: None,
        episode_count: Some(streaming_episodes.len() as u32),
        duration_minutes: Some(24),
        trailer: None,
        cover_image: None,
        banner_image: None,
        genres: Vec::new(),
        average_score: None,
        studios: Vec::new(),
        streaming_episodes: streaming_episodes
            .iter()
            .map(|(title, thumbnail)| StreamingEpisode {
                title: title.to_string(),
                thumbnail: Some(thumbnail.to_string()),
            })
            .collect(),
    }
}

#[async_trait]
impl MetadataProvider for MockCatalog {
    async fn search(&self, term: &str) -> Result<Vec<CatalogCandidate>, MetadataRetrievalError> {
        if self.fail_search {
            return Err(MetadataRetrievalError::RequestError(format!(
                "mock search failure for '{}'",
                term
            )));
        }
        Ok(self.candidates.clone())
    }

    async fn fetch_detail(&self, id: CatalogId) -> Result<CatalogDetail, MetadataRetrievalError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.details
            .get(&id)
            .cloned()
            .ok_or_else(|| MetadataRetrievalError::AnimeNotFound(format!("id {}", id)))
    }
}
