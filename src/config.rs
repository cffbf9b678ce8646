use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::ingest::orchestrator::Concurrency;
use crate::llm::openai::OpenAiClientConfig;
use crate::reddit::types::TimeWindow;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_USER_AGENT: &str = "server:nichetrack:0.1.0";
const DEFAULT_REDDIT_BASE_URL: &str = "https://www.reddit.com";
const DEFAULT_REDDIT_OAUTH_BASE_URL: &str = "https://oauth.reddit.com";
const DEFAULT_REDDIT_TIMEOUT_SECS: u64 = 30;

/// Snapshot of the variables configuration is read from.
///
/// Built from the process environment in `main` (after `.env` is loaded) and
/// from literal pairs in tests.
#[derive(Clone, Debug, Default)]
pub struct ConfigSource {
    vars: HashMap<String, String>,
}

impl ConfigSource {
    pub fn from_env() -> Self {
        Self { vars: std::env::vars().collect() }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Trimmed value; blank counts as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

pub fn parse_or<T: FromStr>(src: &ConfigSource, key: &'static str, default: T) -> Result<T, ConfigError> {
    match src.get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

/// Absolute http(s) base URL, returned without a trailing slash.
pub fn parse_url_or(src: &ConfigSource, key: &'static str, default: &str) -> Result<String, ConfigError> {
    let Some(raw) = src.get(key) else { return Ok(default.to_string()) };
    match Url::parse(&raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(raw.trim_end_matches('/').to_string()),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}

pub fn parse_flag(src: &ConfigSource, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = src.get(key) else { return Ok(default) };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub reddit: RedditConfig,
    pub openai: OpenAiClientConfig,
    pub server: ServerConfig,
}

#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub post_limit: u32,
    pub window: TimeWindow,
    pub comment_limit: u32,
    pub summarize: bool,
    pub classify: bool,
    pub concurrency: Concurrency,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            post_limit: 5,
            window: TimeWindow::Day,
            comment_limit: 5,
            summarize: true,
            classify: false,
            concurrency: Concurrency::Concurrent,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RedditConfig {
    pub user_agent: String,
    pub base_url: String,
    pub oauth_base_url: String,
    pub timeout: Duration,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            base_url: DEFAULT_REDDIT_BASE_URL.to_string(),
            oauth_base_url: DEFAULT_REDDIT_OAUTH_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REDDIT_TIMEOUT_SECS),
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
        }
    }
}

/// Script-app credentials for the password grant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl RedditConfig {
    /// `Ok(None)` means anonymous access; a partial set is an error.
    pub fn credentials(&self) -> Result<Option<RedditCredentials>, ConfigError> {
        let fields = [
            ("REDDIT_CLIENT_ID", &self.client_id),
            ("REDDIT_CLIENT_SECRET", &self.client_secret),
            ("REDDIT_USERNAME", &self.username),
            ("REDDIT_PASSWORD", &self.password),
        ];
        let missing: Vec<&'static str> = fields.iter().filter(|(_, v)| v.is_none()).map(|(k, _)| *k).collect();
        if missing.len() == fields.len() {
            return Ok(None);
        }
        if !missing.is_empty() {
            return Err(ConfigError::PartialRedditCredentials { missing });
        }
        match (&self.client_id, &self.client_secret, &self.username, &self.password) {
            (Some(client_id), Some(client_secret), Some(username), Some(password)) => Ok(Some(RedditCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                username: username.clone(),
                password: password.clone(),
            })),
            _ => Ok(None),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind: String,
    pub ingest_secret: Option<String>,
}

impl AppConfig {
    pub fn from_source(src: &ConfigSource) -> Result<Self, ConfigError> {
        let defaults = IngestConfig::default();
        let ingest = IngestConfig {
            post_limit: parse_or(src, "NICHETRACK_POST_LIMIT", defaults.post_limit)?,
            window: parse_or(src, "NICHETRACK_TIME_WINDOW", defaults.window)?,
            comment_limit: parse_or(src, "NICHETRACK_COMMENT_LIMIT", defaults.comment_limit)?,
            summarize: parse_flag(src, "NICHETRACK_SUMMARIZE", defaults.summarize)?,
            classify: parse_flag(src, "NICHETRACK_CLASSIFY", defaults.classify)?,
            concurrency: parse_or(src, "NICHETRACK_CONCURRENCY", defaults.concurrency)?,
        };
        if ingest.post_limit == 0 || ingest.post_limit > 100 {
            return Err(ConfigError::Invalid { key: "NICHETRACK_POST_LIMIT", value: ingest.post_limit.to_string() });
        }

        let reddit_defaults = RedditConfig::default();
        let reddit = RedditConfig {
            user_agent: src.get("REDDIT_USER_AGENT").unwrap_or(reddit_defaults.user_agent),
            base_url: parse_url_or(src, "REDDIT_BASE_URL", &reddit_defaults.base_url)?,
            oauth_base_url: parse_url_or(src, "REDDIT_OAUTH_BASE_URL", &reddit_defaults.oauth_base_url)?,
            timeout: Duration::from_secs(parse_or(src, "REDDIT_TIMEOUT_SECS", DEFAULT_REDDIT_TIMEOUT_SECS)?),
            client_id: src.get("REDDIT_CLIENT_ID"),
            client_secret: src.get("REDDIT_CLIENT_SECRET"),
            username: src.get("REDDIT_USERNAME"),
            password: src.get("REDDIT_PASSWORD"),
        };

        let server = ServerConfig {
            bind: src.get("NICHETRACK_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            ingest_secret: src.get("NICHETRACK_INGEST_SECRET"),
        };

        Ok(Self { ingest, reddit, openai: OpenAiClientConfig::from_source(src)?, server })
    }

    /// Gate run before any source is enumerated.
    pub fn pipeline_credentials(&self) -> Result<(), ConfigError> {
        let needs_llm = self.ingest.summarize || self.ingest.classify;
        if needs_llm && self.openai.api_key.is_none() {
            return Err(ConfigError::Missing { key: "OPENAI_API_KEY" });
        }
        self.reddit.credentials().map(|_| ())
    }

    pub fn ingest_secret(&self) -> Result<&str, ConfigError> {
        self.server
            .ingest_secret
            .as_deref()
            .ok_or(ConfigError::Missing { key: "NICHETRACK_INGEST_SECRET" })
    }
}
