//! Streaming site scraping module
//!
//! This module provides the data structures scraped from the streaming site
//! (anime pages, listings, server descriptors) and the trait for implementing
//! site scrapers.

#[cfg(test)]
pub(crate) mod mock;
mod samehadaku;

pub use samehadaku::SamehadakuScraper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while scraping the streaming site
#[derive(Debug, Error)]
pub enum ScraperError {
    /// Request to the site failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The requested page does not exist
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// A required element or attribute is missing from the page
    #[error("Missing {field} in {context}")]
    MissingField {
        field: &'static str,
        context: String,
    },

    /// A link on the page could not be turned into a site path
    #[error("Invalid link '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    /// A CSS selector could not be parsed
    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// The anime page of the site: its title and the episodes it links to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimePage {
    /// Title with the site's "Nonton Anime " prefix removed
    pub title: String,
    /// Site-local episode page paths, newest first as the site lists them
    pub episodes: Vec<String>,
}

/// One entry of a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Display title as shown on the page
    pub title: String,
    /// Site-local path of the anime page
    pub path: String,
}

/// The listing pages the site offers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// The home page's top ten
    TopTen,
    /// The home page's latest episode updates
    LatestUpdates,
    /// Most popular anime in all of the given genres
    PopularByGenre(Vec<String>),
    /// Keyword search results
    Search(String),
}

/// A provider/server combination offered on an episode page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerResource {
    pub post: String,
    pub nume: String,
    /// The server's `data-type` attribute
    #[serde(rename = "type")]
    pub kind: String,
    /// Display name, never sent back to the site
    pub name: String,
}

/// The part of a [`ServerResource`] that is submitted to resolve it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSelector {
    pub post: String,
    pub nume: String,
    pub kind: String,
}

impl From<&ServerResource> for ServerSelector {
    fn from(resource: &ServerResource) -> Self {
        Self {
            post: resource.post.clone(),
            nume: resource.nume.clone(),
            kind: resource.kind.clone(),
        }
    }
}

impl ServerSelector {
    /// Form fields for the player endpoint
    pub fn form_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("action", "player_ajax"),
            ("post", &self.post),
            ("nume", &self.nume),
            ("type", &self.kind),
        ]
    }
}

/// Trait for scrapers of the streaming site.
///
/// Implementors fetch pages of the site and extract titles, episode links,
/// listings and video server descriptors from them.
#[async_trait]
pub trait SiteScraper: Send + Sync {
    /// Fetches the anime page for a site-local anime id or path
    async fn anime_page(&self, anime_id: &str) -> Result<AnimePage, ScraperError>;

    /// Fetches a listing page and returns its entries in page order
    async fn listing(&self, listing: &Listing) -> Result<Vec<ListingEntry>, ScraperError>;

    /// Enumerates the video servers offered on an episode page
    async fn server_list(&self, video_id: &str) -> Result<Vec<ServerResource>, ScraperError>;

    /// Exchanges a server selector for the URL of the embedded player
    async fn embed_url(&self, selector: &ServerSelector) -> Result<String, ScraperError>;
}
