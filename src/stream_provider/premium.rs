//! Direct host stream resolver

use super::{AbortSignal, StreamError, StreamResolver, send};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;

/// Opens embed URLs that already point at the video
///
/// These hosts reject requests without a browser-like User-Agent.
pub struct PremiumResolver {
    client: reqwest::Client,
    user_agent: String,
}

impl PremiumResolver {
    pub fn new(client: reqwest::Client, user_agent: &str) -> Self {
        Self {
            client,
            user_agent: user_agent.to_string(),
        }
    }
}

#[async_trait]
impl StreamResolver for PremiumResolver {
    async fn resolve(&self, url: &str, signal: &AbortSignal) -> Result<reqwest::Response, StreamError> {
        send(self.client.get(url).header(USER_AGENT, &self.user_agent), signal).await
    }
}
