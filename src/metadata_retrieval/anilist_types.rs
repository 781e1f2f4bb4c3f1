/// AniList GraphQL response types for deserialization.
///
/// These structures mirror the JSON response format of the AniList API for
/// the two queries issued by the provider.
use super::MediaStatus;
use serde::Deserialize;

/// GraphQL envelope: either `data`, `errors`, or both.
#[derive(Debug, Deserialize)]
pub(super) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// A single GraphQL error entry
#[derive(Debug, Deserialize)]
pub(super) struct GraphQlError {
    pub message: String,
    pub status: Option<u16>,
}

/// `data` of the search query
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct SearchData {
    pub page: SearchPage,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchPage {
    #[serde(default)]
    pub media: Vec<SearchMedia>,
}

/// One search hit with the fields needed for matching and summaries
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchMedia {
    pub id: u32,
    pub title: MediaTitle,
    #[serde(default)]
    pub synonyms: Vec<Option<String>>,
    pub average_score: Option<u32>,
    pub cover_image: Option<CoverImage>,
    pub season_year: Option<i32>,
}

/// Title variants; any of them may be null
#[derive(Debug, Deserialize)]
pub(super) struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CoverImage {
    pub large: Option<String>,
}

/// `data` of the detail query
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct DetailData {
    pub media: Option<DetailMedia>,
}

/// The full media record
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DetailMedia {
    pub id: u32,
    pub title: MediaTitle,
    pub status: Option<MediaStatus>,
    pub description: Option<String>,
    pub start_date: Option<FuzzyDate>,
    pub end_date: Option<FuzzyDate>,
    pub season_year: Option<i32>,
    pub episodes: Option<u32>,
    pub duration: Option<u32>,
    pub trailer: Option<MediaTrailer>,
    pub cover_image: Option<CoverImage>,
    pub banner_image: Option<String>,
    #[serde(default)]
    pub genres: Vec<Option<String>>,
    pub average_score: Option<u32>,
    pub studios: Option<StudioConnection>,
    #[serde(default)]
    pub streaming_episodes: Vec<MediaStreamingEpisode>,
}

/// A date where every component may be unknown
#[derive(Debug, Deserialize)]
pub(super) struct FuzzyDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct MediaTrailer {
    pub id: Option<String>,
    pub site: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StudioConnection {
    #[serde(default)]
    pub nodes: Vec<Studio>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Studio {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct MediaStreamingEpisode {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
}
