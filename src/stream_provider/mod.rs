//! Stream resolution module
//!
//! This module turns the embed URL of a video server into a live byte stream.
//! Every hosting provider needs a different dance to get from the embed URL
//! to the actual video, so each one has its own [`StreamResolver`]. The
//! [`StreamProviders`] registry picks the resolver for a [`ProviderKind`] and
//! wraps the final response into an abortable [`StreamHandle`].

mod abort;
mod blogger;
mod filedon;
mod pixeldrain;
mod premium;

pub use abort::AbortSignal;
pub use blogger::BloggerResolver;
pub use filedon::FiledonResolver;
pub use pixeldrain::PixeldrainResolver;
pub use premium::PremiumResolver;

use abort::Binding;
use crate::config::ProviderConfig;
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::Abortable;
use futures::stream::{BoxStream, Stream, StreamExt};
use parking_lot::Mutex;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use url::Url;

/// Errors that can occur while resolving or reading a stream
#[derive(Debug, Error)]
pub enum StreamError {
    /// Request to the provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The provider answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// The provider's page does not describe a playable stream
    #[error("Invalid stream source: {0}")]
    InvalidSource(String),

    /// The provider's response could not be parsed
    #[error("Failed to parse provider response: {0}")]
    ParseError(String),

    /// The embed URL is not a valid URL
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    /// The resolution or the stream was aborted
    #[error("Stream was aborted")]
    Aborted,
}

/// The hosting providers a video server can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Blogger video embeds
    Blogger,
    /// Direct file hosts that only need a browser User-Agent
    Premium,
    /// Pixeldrain file pages
    Pixeldrain,
    /// Filedon file pages
    Filedon,
}

impl ProviderKind {
    /// Guesses the provider from the host of an embed URL
    ///
    /// Unknown hosts and unparsable URLs are treated as direct hosts.
    pub fn detect(embed_url: &str) -> Self {
        let host = Url::parse(embed_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
            .unwrap_or_default();

        if host.ends_with("blogger.com") || host.ends_with("blogspot.com") {
            ProviderKind::Blogger
        } else if host.contains("pixeldrain") {
            ProviderKind::Pixeldrain
        } else if host.contains("filedon") {
            ProviderKind::Filedon
        } else {
            ProviderKind::Premium
        }
    }

    /// Picks the provider for a server
    ///
    /// The server's type field wins when it names a provider; otherwise the
    /// provider is detected from the embed URL.
    pub fn select(kind_field: &str, embed_url: &str) -> Self {
        kind_field
            .parse()
            .unwrap_or_else(|_| Self::detect(embed_url))
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Blogger => "blogger",
            ProviderKind::Premium => "premium",
            ProviderKind::Pixeldrain => "pixeldrain",
            ProviderKind::Filedon => "filedon",
        };
        f.write_str(name)
    }
}

impl FromStr for ProviderKind {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blogger" | "blogspot" => Ok(ProviderKind::Blogger),
            "premium" => Ok(ProviderKind::Premium),
            "pixeldrain" => Ok(ProviderKind::Pixeldrain),
            "filedon" => Ok(ProviderKind::Filedon),
            other => Err(StreamError::InvalidSource(format!("unknown provider '{}'", other))),
        }
    }
}

/// Trait for provider-specific stream resolution.
///
/// A resolver follows the provider's hops from an embed URL to the response
/// carrying the video bytes. Every request it sends must be bound to the
/// given signal so the resolution can be cancelled midway.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// Resolves an embed URL to the streaming response of the video
    ///
    /// # Arguments
    ///
    /// * `url` - The embed URL of the video server
    /// * `signal` - The signal every network hop is bound to
    async fn resolve(&self, url: &str, signal: &AbortSignal) -> Result<reqwest::Response, StreamError>;
}

type VideoBytes = BoxStream<'static, Result<Bytes, StreamError>>;

/// Byte stream of a resolved video
///
/// Ends early when its signal is aborted. The underlying response is
/// released as soon as the stream ends or the signal is aborted, even if the
/// stream is never polled again.
pub struct ByteStream {
    inner: Arc<Mutex<Option<Abortable<VideoBytes>>>>,
    _binding: Binding,
}

impl ByteStream {
    pub(crate) fn new(stream: VideoBytes, signal: &AbortSignal) -> Self {
        let inner = Arc::new(Mutex::new(None));
        let slot = Arc::downgrade(&inner);
        let (registration, binding) = signal.bind(Some(Box::new(move || {
            if let Some(slot) = slot.upgrade() {
                let released = slot.lock().take();
                drop(released);
            }
        })));

        *inner.lock() = Some(Abortable::new(stream, registration));
        if signal.is_aborted() {
            inner.lock().take();
        }

        Self {
            inner,
            _binding: binding,
        }
    }

    /// Returns whether the underlying response has been released
    pub fn is_released(&self) -> bool {
        self.inner.lock().is_none()
    }
}

impl Stream for ByteStream {
    type Item = Result<Bytes, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut slot = self.inner.lock();
        let Some(inner) = slot.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(inner).poll_next(cx) {
            Poll::Ready(None) => {
                *slot = None;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

/// A live, abortable video stream
///
/// The caller owns the handle; dropping it releases the connection.
pub struct StreamHandle {
    signal: AbortSignal,
    stream: ByteStream,
    content_length: Option<u64>,
    content_type: Option<String>,
}

impl StreamHandle {
    pub(crate) fn new(
        signal: AbortSignal,
        stream: ByteStream,
        content_length: Option<u64>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            signal,
            stream,
            content_length,
            content_type,
        }
    }

    fn from_response(response: reqwest::Response, signal: AbortSignal) -> Self {
        let content_length = response.content_length();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamError::RequestError(e.to_string())))
            .boxed();
        let stream = ByteStream::new(bytes, &signal);

        Self::new(signal, stream, content_length, content_type)
    }

    /// Stops the stream and releases the connection right away
    ///
    /// No bytes are delivered afterwards, whether or not the handle is
    /// polled again.
    pub fn abort(&self) {
        self.signal.abort();
    }

    /// The signal this stream is bound to
    pub fn abort_signal(&self) -> &AbortSignal {
        &self.signal
    }

    /// Total size announced by the provider, if any
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// MIME type announced by the provider, if any
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Splits the handle so the bytes can be consumed on another task
    pub fn into_parts(self) -> (AbortSignal, ByteStream) {
        (self.signal, self.stream)
    }
}

impl Stream for StreamHandle {
    type Item = Result<Bytes, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}

/// Registry of the resolvers for every [`ProviderKind`]
pub struct StreamProviders {
    blogger: BloggerResolver,
    premium: PremiumResolver,
    pixeldrain: PixeldrainResolver,
    filedon: FiledonResolver,
}

impl StreamProviders {
    /// Creates the registry with all resolvers sharing one HTTP client
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            blogger: BloggerResolver::new(client.clone()),
            premium: PremiumResolver::new(client.clone(), &config.browser_user_agent),
            pixeldrain: PixeldrainResolver::new(client.clone(), &config.pixeldrain_api),
            filedon: FiledonResolver::new(client, &config.filedon_lookup),
        }
    }

    fn resolver(&self, kind: ProviderKind) -> &dyn StreamResolver {
        match kind {
            ProviderKind::Blogger => &self.blogger,
            ProviderKind::Premium => &self.premium,
            ProviderKind::Pixeldrain => &self.pixeldrain,
            ProviderKind::Filedon => &self.filedon,
        }
    }

    /// Opens the stream behind an embed URL with a fresh abort signal
    pub async fn open(&self, kind: ProviderKind, url: &str) -> Result<StreamHandle, StreamError> {
        self.open_with_signal(kind, url, AbortSignal::new()).await
    }

    /// Opens the stream behind an embed URL, bound to the given signal
    ///
    /// Aborting the signal while the resolution is still in progress makes
    /// this return `StreamError::Aborted`.
    pub async fn open_with_signal(
        &self,
        kind: ProviderKind,
        url: &str,
        signal: AbortSignal,
    ) -> Result<StreamHandle, StreamError> {
        if signal.is_aborted() {
            return Err(StreamError::Aborted);
        }

        tracing::debug!(provider = %kind, url, "resolving stream");
        let response = self.resolver(kind).resolve(url, &signal).await?;
        tracing::debug!(provider = %kind, final_url = %response.url(), "stream opened");

        Ok(StreamHandle::from_response(response, signal))
    }
}

/// Sends a request bound to the signal and rejects non-success statuses
pub(crate) async fn send(request: reqwest::RequestBuilder, signal: &AbortSignal) -> Result<reqwest::Response, StreamError> {
    signal
        .run(async move {
            let response = request
                .send()
                .await
                .map_err(|e| StreamError::RequestError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(StreamError::HttpStatus {
                    url: response.url().to_string(),
                    status: response.status().as_u16(),
                });
            }

            Ok(response)
        })
        .await
}

/// Reads a response body to text, bound to the signal
pub(crate) async fn read_text(response: reqwest::Response, signal: &AbortSignal) -> Result<String, StreamError> {
    signal
        .run(async move {
            response
                .text()
                .await
                .map_err(|e| StreamError::RequestError(e.to_string()))
        })
        .await
}

/// Final non-empty path segment of a URL, used as a file id by some hosts
pub(crate) fn file_id(url: &str) -> Result<String, StreamError> {
    let parsed = Url::parse(url).map_err(|source| StreamError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .ok_or_else(|| StreamError::InvalidSource(format!("no file id in '{}'", url)))
}
