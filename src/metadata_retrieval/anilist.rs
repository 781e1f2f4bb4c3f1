/// AniList metadata provider implementation.
use super::anilist_types::{
    DetailData, DetailMedia, FuzzyDate, GraphQlResponse, MediaTitle, SearchData, SearchMedia,
};
use super::{
    CatalogCandidate, CatalogDetail, CatalogId, CatalogSummary, MetadataProvider,
    MetadataRetrievalError, StreamingEpisode, Trailer,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::json;

/// Search query returning every name variant plus the summary fields
const SEARCH_QUERY: &str = r"
query ($search: String!) {
  Page {
    media(search: $search, type: ANIME) {
      id
      title {
        romaji
        english
        native
      }
      synonyms
      averageScore
      coverImage {
        large
      }
      seasonYear
    }
  }
}
";

/// Detail query for a single anime
const DETAIL_QUERY: &str = r"
query ($id: Int!) {
  Media(id: $id) {
    id
    title {
      romaji
      english
      native
    }
    status
    description(asHtml: false)
    startDate {
      year
      month
      day
    }
    endDate {
      year
      month
      day
    }
    seasonYear
    episodes
    duration
    trailer {
      id
      site
      thumbnail
    }
    coverImage {
      large
    }
    bannerImage
    genres
    averageScore
    studios {
      nodes {
        name
      }
    }
    streamingEpisodes {
      title
      thumbnail
    }
  }
}
";

/// Metadata provider for the AniList GraphQL API.
///
/// This provider searches https://graphql.anilist.co for anime candidates
/// and fetches full media records by id.
pub struct AniListProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl AniListProvider {
    /// Creates a new AniList provider sending requests to `endpoint`.
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Posts a GraphQL query and unwraps the `data` member of the response.
    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
        subject: &str,
    ) -> Result<T, MetadataRetrievalError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        // AniList answers unknown ids with a 404 and a GraphQL error body
        if response.status() == 404 {
            return Err(MetadataRetrievalError::AnimeNotFound(subject.to_string()));
        }

        if !response.status().is_success() {
            return Err(MetadataRetrievalError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        let envelope: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))?;

        unwrap_envelope(envelope, subject)
    }

    /// Converts a search hit to a candidate with all of its keywords.
    fn convert_candidate(media: SearchMedia) -> CatalogCandidate {
        let SearchMedia {
            id,
            title,
            synonyms,
            average_score,
            cover_image,
            season_year,
        } = media;

        let display_title = display_title(&title);
        let keywords = [title.romaji, title.english, title.native]
            .into_iter()
            .chain(synonyms)
            .flatten()
            .filter(|keyword| !keyword.trim().is_empty())
            .collect();

        CatalogCandidate {
            summary: CatalogSummary {
                id,
                title: display_title,
                cover_image: cover_image.and_then(|c| c.large),
                year: season_year,
                average_score,
            },
            keywords,
        }
    }

    /// Converts the raw media record to our normalized CatalogDetail.
    fn convert_detail(media: DetailMedia) -> CatalogDetail {
        let mut genres: Vec<String> = Vec::new();
        for genre in media.genres.into_iter().flatten() {
            if !genres.contains(&genre) {
                genres.push(genre);
            }
        }

        CatalogDetail {
            id: media.id,
            title: display_title(&media.title),
            status: media.status,
            description: media
                .description
                .map(|d| nanohtml2text::html2text(&d).trim().to_string())
                .unwrap_or_default(),
            start_date: media.start_date.as_ref().and_then(to_date),
            end_date: media.end_date.as_ref().and_then(to_date),
            year: media.season_year,
            episode_count: media.episodes,
            duration_minutes: media.duration,
            trailer: media.trailer.map(|t| Trailer {
                id: t.id,
                site: t.site,
                thumbnail: t.thumbnail,
            }),
            cover_image: media.cover_image.and_then(|c| c.large),
            banner_image: media.banner_image,
            genres,
            average_score: media.average_score,
            studios: media
                .studios
                .map(|s| s.nodes.into_iter().map(|studio| studio.name).collect())
                .unwrap_or_default(),
            streaming_episodes: media
                .streaming_episodes
                .into_iter()
                .map(|episode| StreamingEpisode {
                    title: episode.title.unwrap_or_default(),
                    thumbnail: episode.thumbnail,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl MetadataProvider for AniListProvider {
    async fn search(&self, term: &str) -> Result<Vec<CatalogCandidate>, MetadataRetrievalError> {
        let data: SearchData = self
            .query(SEARCH_QUERY, json!({ "search": term }), term)
            .await?;

        tracing::debug!(term, hits = data.page.media.len(), "catalog search");

        Ok(data
            .page
            .media
            .into_iter()
            .map(Self::convert_candidate)
            .collect())
    }

    async fn fetch_detail(&self, id: CatalogId) -> Result<CatalogDetail, MetadataRetrievalError> {
        let subject = format!("id {}", id);
        let data: DetailData = self
            .query(DETAIL_QUERY, json!({ "id": id }), &subject)
            .await?;

        let media = data
            .media
            .ok_or(MetadataRetrievalError::AnimeNotFound(subject))?;

        Ok(Self::convert_detail(media))
    }
}

/// Extracts `data` from a GraphQL envelope, turning reported errors into ours.
fn unwrap_envelope<T>(
    envelope: GraphQlResponse<T>,
    subject: &str,
) -> Result<T, MetadataRetrievalError> {
    if let Some(data) = envelope.data {
        return Ok(data);
    }

    match envelope.errors.first() {
        Some(error) if error.status == Some(404) => Err(MetadataRetrievalError::AnimeNotFound(
            subject.to_string(),
        )),
        Some(error) => Err(MetadataRetrievalError::InvalidData(error.message.clone())),
        None => Err(MetadataRetrievalError::InvalidData(
            "Response contained neither data nor errors".to_string(),
        )),
    }
}

/// The English title when available, otherwise romaji, otherwise native.
fn display_title(title: &MediaTitle) -> String {
    title
        .english
        .as_ref()
        .or(title.romaji.as_ref())
        .or(title.native.as_ref())
        .cloned()
        .unwrap_or_default()
}

/// Converts a fuzzy date to a calendar date; unknown month or day count as 1.
fn to_date(date: &FuzzyDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year?, date.month.unwrap_or(1), date.day.unwrap_or(1))
}
