//! Filedon stream resolver
//!
//! Filedon hides the video behind a lookup: the page slug is posted to the
//! lookup endpoint, which answers with the temporary download URL.

use super::{AbortSignal, StreamError, StreamResolver, file_id, read_text, send};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LookupResponse {
    data: LookupData,
}

#[derive(Debug, Deserialize)]
struct LookupData {
    url: String,
}

/// Resolves Filedon file pages
pub struct FiledonResolver {
    client: reqwest::Client,
    lookup_url: String,
}

impl FiledonResolver {
    pub fn new(client: reqwest::Client, lookup_url: &str) -> Self {
        Self {
            client,
            lookup_url: lookup_url.to_string(),
        }
    }
}

#[async_trait]
impl StreamResolver for FiledonResolver {
    async fn resolve(&self, url: &str, signal: &AbortSignal) -> Result<reqwest::Response, StreamError> {
        let slug = file_id(url)?;
        let lookup = self
            .client
            .post(&self.lookup_url)
            .json(&serde_json::json!({ "slug": slug }));

        let body = read_text(send(lookup, signal).await?, signal).await?;
        let video_url = parse_lookup(&body)?;
        tracing::debug!(%slug, %video_url, "filedon lookup resolved");

        send(self.client.get(video_url), signal).await
    }
}

fn parse_lookup(body: &str) -> Result<String, StreamError> {
    let lookup: LookupResponse = serde_json::from_str(body).map_err(|e| StreamError::ParseError(e.to_string()))?;

    if lookup.data.url.is_empty() {
        return Err(StreamError::InvalidSource("Filedon lookup returned no URL".to_string()));
    }

    Ok(lookup.data.url)
}
