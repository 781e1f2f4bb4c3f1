//! Blogger stream resolver
//!
//! Blogger embed pages carry the player configuration as a JavaScript
//! assignment, `var VIDEO_CONFIG = {...}`. The first stream's `play_url` is
//! the actual video.

use super::{AbortSignal, StreamError, StreamResolver, read_text, send};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static VIDEO_CONFIG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)var\s+VIDEO_CONFIG\s*=\s*(.+?);?\s*$").expect("valid VIDEO_CONFIG pattern")
});

#[derive(Debug, Deserialize)]
struct VideoConfig {
    #[serde(default)]
    streams: Vec<VideoStream>,
}

#[derive(Debug, Deserialize)]
struct VideoStream {
    play_url: String,
}

/// Resolves Blogger video embeds
pub struct BloggerResolver {
    client: reqwest::Client,
}

impl BloggerResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamResolver for BloggerResolver {
    async fn resolve(&self, url: &str, signal: &AbortSignal) -> Result<reqwest::Response, StreamError> {
        let page = send(self.client.get(url), signal).await?;
        let page = read_text(page, signal).await?;
        let play_url = extract_play_url(&page)?;

        send(self.client.get(play_url), signal).await
    }
}

/// Extracts the first stream's play URL from a Blogger embed page
fn extract_play_url(page: &str) -> Result<String, StreamError> {
    let captures = VIDEO_CONFIG_PATTERN
        .captures(page)
        .ok_or_else(|| StreamError::InvalidSource("no VIDEO_CONFIG in Blogger page".to_string()))?;

    let config: VideoConfig =
        serde_json::from_str(&captures[1]).map_err(|e| StreamError::ParseError(e.to_string()))?;

    config
        .streams
        .into_iter()
        .next()
        .map(|stream| stream.play_url)
        .ok_or_else(|| StreamError::InvalidSource("Blogger VIDEO_CONFIG lists no streams".to_string()))
}
