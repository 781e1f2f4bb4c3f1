//! Episode reconciliation module
//!
//! The streaming site knows which episodes exist and where to watch them; the
//! catalog knows what they are called and what they look like. This module
//! merges the two episode lists into one chronological list, positionally,
//! without any I/O.

use crate::metadata_retrieval::StreamingEpisode;
use serde::{Deserialize, Serialize};

/// A single watchable episode with the best metadata available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledEpisode {
    /// Catalog title, or "Episode N" when the catalog undercounts the site
    pub title: String,
    /// Catalog thumbnail, if the catalog metadata was used
    pub thumbnail: Option<String>,
    /// Site-local path of the episode page
    pub video_id: String,
}

/// Result of merging the site's and the catalog's episode lists
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// One entry per scraped episode, oldest first
    pub episodes: Vec<ReconciledEpisode>,
    /// Oldest scraped episode when the catalog lists at most one streaming
    /// episode (movies and specials)
    pub movie_id: Option<String>,
}

/// Merges scraped episode links with catalog streaming episodes
///
/// Both inputs are newest-first, as their sources deliver them. The output
/// always has exactly one entry per scraped link, ordered oldest first:
///
/// - If the catalog lists fewer episodes than the site, its metadata is
///   ignored and episodes are titled "Episode 1", "Episode 2", ...
/// - Otherwise the catalog entries are paired with the site's links by
///   position (oldest with oldest); catalog entries beyond the site's count
///   are dropped.
///
/// Pairing is positional, so a catalog that mixes specials into its list
/// can shift titles against the actual episodes.
///
/// # Arguments
///
/// * `scraped_links` - Episode page paths from the site, newest first
/// * `catalog_episodes` - Streaming episodes from the catalog, newest first
///
/// # Examples
///
/// ```ignore
/// let merged = reconcile(&["/ep-2/".into(), "/ep-1/".into()], &[]);
/// assert_eq!(merged.episodes[0].title, "Episode 1");
/// assert_eq!(merged.episodes[0].video_id, "/ep-1/");
/// ```
pub fn reconcile(scraped_links: &[String], catalog_episodes: &[StreamingEpisode]) -> Reconciliation {
    let chronological_links = scraped_links.iter().rev();

    let episodes = if catalog_episodes.len() < scraped_links.len() {
        chronological_links
            .enumerate()
            .map(|(index, link)| ReconciledEpisode {
                title: format!("Episode {}", index + 1),
                thumbnail: None,
                video_id: link.clone(),
            })
            .collect()
    } else {
        catalog_episodes
            .iter()
            .rev()
            .zip(chronological_links)
            .map(|(episode, link)| ReconciledEpisode {
                title: episode.title.clone(),
                thumbnail: episode.thumbnail.clone(),
                video_id: link.clone(),
            })
            .collect()
    };

    let movie_id = if catalog_episodes.len() <= 1 {
        scraped_links.last().cloned()
    } else {
        None
    };

    Reconciliation { episodes, movie_id }
}
