//! Runtime configuration
//!
//! Every endpoint the crate talks to and every tunable knob lives here.
//! Defaults point at the public services; environment variables and command
//! line flags override them.

use crate::fuzzy_match::DEFAULT_SIMILARITY_THRESHOLD;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default root of the streaming site
pub const DEFAULT_SITE_URL: &str = "https://samehadaku.now/";

/// Default AniList GraphQL endpoint
pub const DEFAULT_CATALOG_URL: &str = "https://graphql.anilist.co";

/// User-Agent the streaming site and the direct hosts accept
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT)";

/// Errors in the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A URL setting does not parse
    #[error("{name} is not a valid URL: '{value}'")]
    InvalidUrl { name: &'static str, value: String },

    /// A numeric setting does not parse or is out of range
    #[error("{name} has an invalid value: '{value}'")]
    InvalidValue { name: &'static str, value: String },

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Streaming site settings
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SITE_URL.to_string(),
        }
    }
}

/// Metadata catalog settings
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    pub endpoint: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CATALOG_URL.to_string(),
        }
    }
}

/// Hosting provider endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Pixeldrain file API, the file id is appended
    pub pixeldrain_api: String,
    /// Filedon slug lookup endpoint
    pub filedon_lookup: String,
    /// User-Agent sent to direct hosts
    pub browser_user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            pixeldrain_api: "https://pixeldrain.com/api/file".to_string(),
            filedon_lookup: "https://filedon.co/get-url".to_string(),
            browser_user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

/// Title matching settings
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Minimum similarity in `[0, 1]` a catalog entry needs to be accepted
    pub similarity_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Shared HTTP client settings
#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub site: SiteConfig,
    pub catalog: CatalogConfig,
    pub providers: ProviderConfig,
    pub matching: MatchConfig,
    pub http: HttpConfig,
}

impl Config {
    /// Loads the defaults with overrides from `ANISTREAM_*` environment variables
    ///
    /// Recognized variables are `ANISTREAM_SITE_URL`, `ANISTREAM_CATALOG_URL`,
    /// `ANISTREAM_USER_AGENT`, `ANISTREAM_MATCH_THRESHOLD` and
    /// `ANISTREAM_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Config::from_env`] with a custom variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("ANISTREAM_SITE_URL") {
            config.site.base_url = url;
        }
        if let Some(url) = lookup("ANISTREAM_CATALOG_URL") {
            config.catalog.endpoint = url;
        }
        if let Some(user_agent) = lookup("ANISTREAM_USER_AGENT") {
            config.http.user_agent = user_agent.clone();
            config.providers.browser_user_agent = user_agent;
        }
        if let Some(value) = lookup("ANISTREAM_MATCH_THRESHOLD") {
            config.matching.similarity_threshold = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "ANISTREAM_MATCH_THRESHOLD",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("ANISTREAM_TIMEOUT_SECS") {
            let secs: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "ANISTREAM_TIMEOUT_SECS",
                value: value.clone(),
            })?;
            config.http.connect_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that URLs parse and numbers are in range
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("site URL", &self.site.base_url)?;
        check_url("catalog endpoint", &self.catalog.endpoint)?;
        check_url("Pixeldrain API", &self.providers.pixeldrain_api)?;
        check_url("Filedon lookup", &self.providers.filedon_lookup)?;

        let threshold = self.matching.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidValue {
                name: "similarity threshold",
                value: threshold.to_string(),
            });
        }

        if self.http.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "connect timeout",
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    /// Builds the HTTP client shared by the site, catalog and providers
    ///
    /// Only the connect phase has a timeout; video streams may run for a long
    /// time.
    pub fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        reqwest::Client::builder()
            .user_agent(&self.http.user_agent)
            .connect_timeout(self.http.connect_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))
    }
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    Url::parse(value).map(|_| ()).map_err(|_| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.site.base_url, "https://samehadaku.now/");
        assert_eq!(config.catalog.endpoint, "https://graphql.anilist.co");
        assert_eq!(config.providers.browser_user_agent, "Mozilla/5.0 (Windows NT)");
        assert_eq!(config.matching.similarity_threshold, 0.6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("ANISTREAM_SITE_URL", "https://mirror.example/"),
            ("ANISTREAM_MATCH_THRESHOLD", "0.75"),
            ("ANISTREAM_TIMEOUT_SECS", "5"),
            ("ANISTREAM_USER_AGENT", "test-agent"),
        ]))
        .unwrap();

        assert_eq!(config.site.base_url, "https://mirror.example/");
        assert_eq!(config.catalog.endpoint, DEFAULT_CATALOG_URL);
        assert_eq!(config.matching.similarity_threshold, 0.75);
        assert_eq!(config.http.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.http.user_agent, "test-agent");
        assert_eq!(config.providers.browser_user_agent, "test-agent");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("ANISTREAM_MATCH_THRESHOLD", "high")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("ANISTREAM_MATCH_THRESHOLD", "1.5")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("ANISTREAM_TIMEOUT_SECS", "0")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("ANISTREAM_SITE_URL", "samehadaku")])),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
