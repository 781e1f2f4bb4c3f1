//! Pixeldrain stream resolver

use super::{AbortSignal, StreamError, StreamResolver, file_id, send};
use async_trait::async_trait;

/// Resolves Pixeldrain file pages through the file API
pub struct PixeldrainResolver {
    client: reqwest::Client,
    api_base: String,
}

impl PixeldrainResolver {
    /// Creates a resolver for the file API rooted at `api_base`,
    /// e.g. `https://pixeldrain.com/api/file`
    pub fn new(client: reqwest::Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn file_url(&self, embed_url: &str) -> Result<String, StreamError> {
        Ok(format!("{}/{}", self.api_base, file_id(embed_url)?))
    }
}

#[async_trait]
impl StreamResolver for PixeldrainResolver {
    async fn resolve(&self, url: &str, signal: &AbortSignal) -> Result<reqwest::Response, StreamError> {
        let file_url = self.file_url(url)?;
        send(self.client.get(file_url), signal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url_uses_last_segment() {
        let resolver = PixeldrainResolver::new(reqwest::Client::new(), "https://pixeldrain.com/api/file/");

        assert_eq!(
            resolver.file_url("https://pixeldrain.com/u/Ab3xYz").unwrap(),
            "https://pixeldrain.com/api/file/Ab3xYz"
        );
    }
}
