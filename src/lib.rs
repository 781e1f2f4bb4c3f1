//! AniStream - Anime metadata and stream resolution
//!
//! This library scrapes an anime streaming site, identifies each scraped title
//! in the AniList catalog, merges the site's episode links with the catalog's
//! episode metadata, and opens the video behind a chosen server as an
//! abortable byte stream.

mod config;
mod fuzzy_match;
#[cfg(test)]
mod local_http;
mod metadata_retrieval;
mod reconcile;
mod site_scraper;
mod stream_provider;

use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;

// Re-export error types
pub use config::ConfigError;
pub use fuzzy_match::MatchError;
pub use metadata_retrieval::MetadataRetrievalError;
pub use site_scraper::ScraperError;
pub use stream_provider::StreamError;

// Re-export configuration and building blocks
pub use config::{
    CatalogConfig, Config, HttpConfig, MatchConfig, ProviderConfig, SiteConfig, BROWSER_USER_AGENT,
    DEFAULT_CATALOG_URL, DEFAULT_SITE_URL,
};
pub use fuzzy_match::{
    DEFAULT_SIMILARITY_THRESHOLD, FuzzyResolver, Keywords, ScoredMatch, Similarity, TitleSimilarity,
    normalize_title,
};
pub use metadata_retrieval::{
    AniListProvider, CatalogCandidate, CatalogDetail, CatalogId, CatalogSummary, MediaStatus,
    MetadataProvider, ResolvingCatalog, StreamingEpisode, Trailer,
};
pub use reconcile::{ReconciledEpisode, Reconciliation, reconcile};
pub use site_scraper::{
    AnimePage, Listing, ListingEntry, SamehadakuScraper, ServerResource, ServerSelector, SiteScraper,
};
pub use stream_provider::{
    AbortSignal, BloggerResolver, ByteStream, FiledonResolver, PixeldrainResolver, PremiumResolver,
    ProviderKind, StreamHandle, StreamProviders, StreamResolver,
};

/// Coarse classification of every failure the library reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The page, anime or catalog entry does not exist or did not match
    NotFound,
    /// A provider page does not describe a playable stream
    InvalidSource,
    /// A remote service failed or answered with a non-success status
    Upstream,
    /// A response lacks a required field or does not parse
    MalformedResponse,
    /// The stream resolution was cancelled
    Aborted,
    /// The configuration is invalid
    Config,
}

/// Top-level error type for AniStream operations
#[derive(Debug, Error)]
pub enum AniStreamError {
    /// Error during catalog lookup or title resolution
    #[error("Metadata retrieval error: {0}")]
    MetadataRetrieval(#[from] MetadataRetrievalError),

    /// Error while scraping the streaming site
    #[error("Scraper error: {0}")]
    Scraper(#[from] ScraperError),

    /// Error while resolving or reading a stream
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AniStreamError {
    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AniStreamError::MetadataRetrieval(e) => match e {
                MetadataRetrievalError::AnimeNotFound(_) | MetadataRetrievalError::NoMatch(_) => {
                    ErrorKind::NotFound
                }
                MetadataRetrievalError::RequestError(_) => ErrorKind::Upstream,
                MetadataRetrievalError::ParseError(_) | MetadataRetrievalError::InvalidData(_) => {
                    ErrorKind::MalformedResponse
                }
            },
            AniStreamError::Scraper(e) => match e {
                ScraperError::PageNotFound(_) => ErrorKind::NotFound,
                ScraperError::RequestError(_) => ErrorKind::Upstream,
                ScraperError::MissingField { .. }
                | ScraperError::InvalidUrl { .. }
                | ScraperError::Selector(_) => ErrorKind::MalformedResponse,
            },
            AniStreamError::Stream(e) => match e {
                StreamError::RequestError(_) | StreamError::HttpStatus { .. } => ErrorKind::Upstream,
                StreamError::InvalidSource(_) | StreamError::InvalidUrl { .. } => ErrorKind::InvalidSource,
                StreamError::ParseError(_) => ErrorKind::MalformedResponse,
                StreamError::Aborted => ErrorKind::Aborted,
            },
            AniStreamError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Progress event emitted while assembling an anime detail
///
/// These events allow library users to follow the multi-stage lookup in
/// [`AniStream::get_anime_with_progress`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Fetching the anime page from the site
    FetchingPage { anime_id: String },

    /// Anime page scraped
    PageFetched { title: String, episode_count: usize },

    /// Looking the scraped title up in the catalog
    ResolvingTitle { title: String },

    /// Title matched a catalog entry
    TitleResolved { title: String, catalog_id: CatalogId },

    /// Fetching the full catalog record
    FetchingDetail { catalog_id: CatalogId },

    /// Site and catalog episodes merged
    Reconciled { episode_count: usize, is_movie: bool },
}

/// A listing entry that was identified in the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedAnime {
    /// Catalog summary of the matched entry
    #[serde(flatten)]
    pub summary: CatalogSummary,
    /// Site-local path of the anime page
    pub anime_id: String,
}

/// Everything known about an anime: catalog record plus watchable episodes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeDetail {
    /// Catalog record; its streaming episodes are moved into `episodes`
    pub detail: CatalogDetail,
    /// Reconciled episodes, oldest first
    pub episodes: Vec<ReconciledEpisode>,
    /// Video id of the feature when the anime is a movie or special
    pub movie_id: Option<String>,
}

/// The anime pipeline: site scraping, catalog resolution and streaming
///
/// The default type parameters are the real services; tests plug in
/// in-memory implementations of the two traits.
pub struct AniStream<M = AniListProvider, W = SamehadakuScraper>
where
    M: MetadataProvider,
    W: SiteScraper,
{
    catalog: ResolvingCatalog<M>,
    site: W,
    streams: StreamProviders,
}

impl AniStream<AniListProvider, SamehadakuScraper> {
    /// Builds the pipeline against AniList and the configured site
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let anistream = AniStream::from_config(&Config::from_env()?)?;
    /// for anime in anistream.top_anime().await? {
    ///     println!("{} ({})", anime.summary.title, anime.anime_id);
    /// }
    /// ```
    pub fn from_config(config: &Config) -> Result<Self, AniStreamError> {
        config.validate()?;
        let client = config.http_client()?;

        let provider = AniListProvider::new(client.clone(), config.catalog.endpoint.clone());
        let resolver = FuzzyResolver::with_threshold(config.matching.similarity_threshold);
        let site = SamehadakuScraper::new(client.clone(), &config.site.base_url)?;
        let streams = StreamProviders::new(client, &config.providers);

        Ok(Self::with_parts(ResolvingCatalog::new(provider, resolver), site, streams))
    }
}

impl<M, W> AniStream<M, W>
where
    M: MetadataProvider,
    W: SiteScraper,
{
    /// Assembles the pipeline from its parts
    pub fn with_parts(catalog: ResolvingCatalog<M>, site: W, streams: StreamProviders) -> Self {
        Self {
            catalog,
            site,
            streams,
        }
    }

    /// The home page's top ten, identified in the catalog
    pub async fn top_anime(&self) -> Result<Vec<ListedAnime>, AniStreamError> {
        self.resolve_listing(&Listing::TopTen).await
    }

    /// The home page's latest episode updates, identified in the catalog
    pub async fn latest_updates(&self) -> Result<Vec<ListedAnime>, AniStreamError> {
        self.resolve_listing(&Listing::LatestUpdates).await
    }

    /// The most popular anime in all of the given genres
    pub async fn top_by_genre<S: AsRef<str>>(&self, genres: &[S]) -> Result<Vec<ListedAnime>, AniStreamError> {
        let genres = genres.iter().map(|g| g.as_ref().to_string()).collect();
        self.resolve_listing(&Listing::PopularByGenre(genres)).await
    }

    /// Site search results, identified in the catalog
    pub async fn search(&self, keyword: &str) -> Result<Vec<ListedAnime>, AniStreamError> {
        self.resolve_listing(&Listing::Search(keyword.to_string())).await
    }

    /// Fetches a listing and resolves all of its titles concurrently
    ///
    /// Entries whose title cannot be resolved are dropped; the rest keep the
    /// page order. Only a failure to fetch the listing itself is an error.
    async fn resolve_listing(&self, listing: &Listing) -> Result<Vec<ListedAnime>, AniStreamError> {
        let entries = self.site.listing(listing).await?;
        tracing::info!(?listing, count = entries.len(), "resolving listing");

        let lookups = entries.iter().map(|entry| async move {
            let result = self.catalog.resolve_summary(&entry.title).await;
            (entry, result)
        });

        let resolved = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(entry, result)| match result {
                Ok(summary) => Some(ListedAnime {
                    summary,
                    anime_id: entry.path.clone(),
                }),
                Err(e) => {
                    tracing::debug!(title = %entry.title, error = %e, "dropping listing entry");
                    None
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(?listing, resolved = resolved.len(), "listing resolved");
        Ok(resolved)
    }

    /// Fetches an anime and its watchable episodes
    ///
    /// See [`AniStream::get_anime_with_progress`].
    pub async fn get_anime(&self, anime_id: &str) -> Result<AnimeDetail, AniStreamError> {
        self.get_anime_with_progress(anime_id, |_| {}).await
    }

    /// Fetches an anime and its watchable episodes, reporting progress
    ///
    /// The anime page is scraped, its title resolved in the catalog, the full
    /// catalog record fetched, and both episode lists reconciled. Any failure
    /// aborts the whole lookup; no partial result is returned.
    ///
    /// # Arguments
    ///
    /// * `anime_id` - Site-local anime slug or path, e.g. `/anime/one-piece/`
    /// * `progress_callback` - Closure called with progress events (can be empty for silent operation)
    ///
    /// # Errors
    ///
    /// Fails with an error of kind [`ErrorKind::NotFound`] when the page does
    /// not exist or its title matches no catalog entry. The catalog record is
    /// not requested in the latter case.
    pub async fn get_anime_with_progress<F>(
        &self,
        anime_id: &str,
        mut progress_callback: F,
    ) -> Result<AnimeDetail, AniStreamError>
    where
        F: FnMut(ProgressEvent),
    {
        progress_callback(ProgressEvent::FetchingPage {
            anime_id: anime_id.to_string(),
        });
        let page = self.site.anime_page(anime_id).await?;

        progress_callback(ProgressEvent::PageFetched {
            title: page.title.clone(),
            episode_count: page.episodes.len(),
        });

        progress_callback(ProgressEvent::ResolvingTitle {
            title: page.title.clone(),
        });
        let catalog_id = self.catalog.resolve_id(&page.title).await?;

        progress_callback(ProgressEvent::TitleResolved {
            title: page.title.clone(),
            catalog_id,
        });

        progress_callback(ProgressEvent::FetchingDetail { catalog_id });
        let mut detail = self.catalog.fetch_detail(catalog_id).await?;

        let catalog_episodes = std::mem::take(&mut detail.streaming_episodes);
        let Reconciliation { episodes, movie_id } = reconcile(&page.episodes, &catalog_episodes);

        tracing::info!(
            anime_id,
            catalog_id,
            scraped = page.episodes.len(),
            cataloged = catalog_episodes.len(),
            "reconciled episodes"
        );
        progress_callback(ProgressEvent::Reconciled {
            episode_count: episodes.len(),
            is_movie: movie_id.is_some(),
        });

        Ok(AnimeDetail {
            detail,
            episodes,
            movie_id,
        })
    }

    /// Lists the video servers offered for an episode
    pub async fn server_list(&self, video_id: &str) -> Result<Vec<ServerResource>, AniStreamError> {
        Ok(self.site.server_list(video_id).await?)
    }

    /// Resolves a server to the URL of its embedded player
    pub async fn stream_resource(&self, server: &ServerResource) -> Result<String, AniStreamError> {
        Ok(self.site.embed_url(&ServerSelector::from(server)).await?)
    }

    /// Opens the video behind a server as a stream
    pub async fn open_stream(&self, server: &ServerResource) -> Result<StreamHandle, AniStreamError> {
        self.open_stream_with_signal(server, AbortSignal::new()).await
    }

    /// Opens the video behind a server, bound to the given abort signal
    ///
    /// The server lookup, every provider hop and the resulting byte stream
    /// are all cancelled when the signal is aborted.
    pub async fn open_stream_with_signal(
        &self,
        server: &ServerResource,
        signal: AbortSignal,
    ) -> Result<StreamHandle, AniStreamError> {
        let embed_url = signal
            .run(async { Ok::<_, StreamError>(self.stream_resource(server).await) })
            .await??;
        let kind = ProviderKind::select(&server.kind, &embed_url);
        tracing::info!(server = %server.name, provider = %kind, "opening stream");

        Ok(self.streams.open_with_signal(kind, &embed_url, signal).await?)
    }
}
