/// Data structures and traits for anime catalog metadata retrieval.
///
/// This module provides structures to represent catalog search candidates and
/// full anime detail records (status, dates, studios, streaming episodes), as
/// well as the trait for implementing metadata providers.
mod anilist;
mod anilist_types;
#[cfg(test)]
pub(crate) mod mock;
mod resolving;

pub use anilist::AniListProvider;
pub use resolving::ResolvingCatalog;

use crate::fuzzy_match::{Keywords, MatchError};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of an anime in the metadata catalog
pub type CatalogId = u32;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The requested anime was not found
    #[error("Anime not found: {0}")]
    AnimeNotFound(String),

    /// The API returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),

    /// None of the search candidates matched the requested title
    #[error(transparent)]
    NoMatch(#[from] MatchError),
}

/// Airing status of an anime as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaStatus {
    Finished,
    Releasing,
    NotYetReleased,
    Cancelled,
    Hiatus,
}

/// Short projection of a catalog entry, used for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    /// Catalog identifier
    pub id: CatalogId,
    /// English title, falling back to the romaji title
    pub title: String,
    /// Large cover image URL
    pub cover_image: Option<String>,
    /// Year the anime started airing
    pub year: Option<i32>,
    /// Average user score (0-100)
    pub average_score: Option<u32>,
}

/// A search result together with every name it is known by.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogCandidate {
    /// The summary returned to callers once this candidate wins
    pub summary: CatalogSummary,
    /// Romaji, English and native titles followed by all synonyms
    pub keywords: Vec<String>,
}

impl Keywords for CatalogCandidate {
    fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Trailer reference of an anime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trailer {
    /// Video id on the trailer site
    pub id: Option<String>,
    /// Hosting site (e.g. "youtube")
    pub site: Option<String>,
    /// Thumbnail image URL
    pub thumbnail: Option<String>,
}

/// An episode as listed by the catalog's streaming partners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingEpisode {
    /// Episode title (e.g. "Episode 3 - To You, 2000 Years From Now")
    pub title: String,
    /// Thumbnail image URL
    pub thumbnail: Option<String>,
}

/// Represents a complete catalog record of an anime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDetail {
    pub id: CatalogId,
    pub title: String,
    pub status: Option<MediaStatus>,
    /// Plain-text description with all HTML removed
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub episode_count: Option<u32>,
    /// Length of a single episode in minutes
    pub duration_minutes: Option<u32>,
    pub trailer: Option<Trailer>,
    pub cover_image: Option<String>,
    pub banner_image: Option<String>,
    pub genres: Vec<String>,
    pub average_score: Option<u32>,
    pub studios: Vec<String>,
    /// Streaming episodes, newest first as delivered by the catalog
    pub streaming_episodes: Vec<StreamingEpisode>,
}

/// Trait for metadata providers that can search and describe anime.
///
/// Implementors of this trait can retrieve anime metadata from catalog
/// services such as AniList.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Searches the catalog for anime matching a free-text term.
    ///
    /// # Arguments
    ///
    /// * `term` - The search term, usually a title scraped from the site
    ///
    /// # Returns
    ///
    /// All candidates the catalog considers relevant, in the catalog's order
    async fn search(&self, term: &str) -> Result<Vec<CatalogCandidate>, MetadataRetrievalError>;

    /// Fetches the complete record of a single anime.
    ///
    /// # Arguments
    ///
    /// * `id` - The catalog identifier
    ///
    /// # Returns
    ///
    /// A Result containing the normalized CatalogDetail, or a MetadataRetrievalError
    async fn fetch_detail(&self, id: CatalogId) -> Result<CatalogDetail, MetadataRetrievalError>;
}
