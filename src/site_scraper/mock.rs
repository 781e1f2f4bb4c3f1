//! Mock site scraper for testing.

use super::{AnimePage, Listing, ListingEntry, ScraperError, ServerResource, ServerSelector, SiteScraper};
use async_trait::async_trait;
use std::collections::HashMap;

/// In-memory site with fixed pages, listings and servers.
#[derive(Debug, Default)]
pub(crate) struct MockSite {
    pages: HashMap<String, AnimePage>,
    listing: Vec<ListingEntry>,
    servers: HashMap<String, Vec<ServerResource>>,
    embeds: HashMap<String, String>,
}

impl MockSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an anime page whose episode links are given newest first
    pub fn with_page(mut self, anime_id: &str, title: &str, episodes: &[&str]) -> Self {
        self.pages.insert(
            anime_id.to_string(),
            AnimePage {
                title: title.to_string(),
                episodes: episodes.iter().map(|e| e.to_string()).collect(),
            },
        );
        self
    }

    /// Adds an entry returned for every listing
    pub fn with_listing_entry(mut self, title: &str, path: &str) -> Self {
        self.listing.push(ListingEntry {
            title: title.to_string(),
            path: path.to_string(),
        });
        self
    }

    /// Adds a server to an episode page, resolving to the given embed URL
    pub fn with_server(mut self, video_id: &str, server: ServerResource, embed_url: &str) -> Self {
        self.embeds.insert(server.post.clone() + "/" + &server.nume, embed_url.to_string());
        self.servers.entry(video_id.to_string()).or_default().push(server);
        self
    }
}

#[async_trait]
impl SiteScraper for MockSite {
    async fn anime_page(&self, anime_id: &str) -> Result<AnimePage, ScraperError> {
        self.pages
            .get(anime_id)
            .cloned()
            .ok_or_else(|| ScraperError::PageNotFound(anime_id.to_string()))
    }

    async fn listing(&self, _listing: &Listing) -> Result<Vec<ListingEntry>, ScraperError> {
        Ok(self.listing.clone())
    }

    async fn server_list(&self, video_id: &str) -> Result<Vec<ServerResource>, ScraperError> {
        self.servers
            .get(video_id)
            .cloned()
            .ok_or_else(|| ScraperError::PageNotFound(video_id.to_string()))
    }

    async fn embed_url(&self, selector: &ServerSelector) -> Result<String, ScraperError> {
        self.embeds
            .get(&format!("{}/{}", selector.post, selector.nume))
            .cloned()
            .ok_or(ScraperError::MissingField {
                field: "iframe src",
                context: "player response".to_string(),
            })
    }
}
