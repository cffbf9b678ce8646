//! Reddit content source.
//!
//! Anonymous access reads the public `.json` listings; with script-app
//! credentials the client switches to the OAuth host with a cached bearer
//! token. Every request carries the configured User-Agent.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::config::{RedditConfig, RedditCredentials};
use crate::error::FetchError;

pub mod auth;
pub mod types;

use types::{Listing, Post, RawComment, RawPost, TimeWindow, is_valid_subreddit, qualifying_comments};

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Up to `limit` top posts of `subreddit` within `window`.
    async fn top_posts(&self, subreddit: &str, limit: u32, window: TimeWindow) -> Result<Vec<Post>, FetchError>;

    /// Qualifying top-level comment bodies for one post.
    async fn top_comments(&self, subreddit: &str, post_id: &str, limit: u32) -> Result<Vec<String>, FetchError>;
}

pub struct RedditClient {
    http: HttpClient,
    cfg: RedditConfig,
    creds: Option<RedditCredentials>,
    token: Mutex<Option<auth::AccessToken>>,
}

impl RedditClient {
    /// Partial credentials are rejected by the run gate before any fetch, so
    /// here they simply fall back to anonymous access.
    pub fn new(cfg: RedditConfig) -> Result<Self, reqwest::Error> {
        let http = HttpClient::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()?;
        let creds = cfg.credentials().ok().flatten();
        Ok(Self { http, cfg, creds, token: Mutex::new(None) })
    }

    pub fn is_authenticated(&self) -> bool {
        self.creds.is_some()
    }

    async fn bearer(&self, creds: &RedditCredentials) -> Result<String, FetchError> {
        let mut slot = self.token.lock().await;
        if let Some(tok) = slot.as_ref().filter(|t| t.is_fresh()) {
            return Ok(tok.value.clone());
        }
        let fresh = auth::request_token(&self.http, &self.cfg.base_url, creds).await?;
        let value = fresh.value.clone();
        *slot = Some(fresh);
        Ok(value)
    }

    async fn request(&self, path: &str, query: &[(&str, String)]) -> Result<RequestBuilder, FetchError> {
        match &self.creds {
            None => {
                let url = format!("{}{}.json", self.cfg.base_url.trim_end_matches('/'), path);
                Ok(self.http.get(url).query(query))
            }
            Some(creds) => {
                let token = self.bearer(creds).await?;
                let url = format!("{}{}", self.cfg.oauth_base_url.trim_end_matches('/'), path);
                Ok(self.http.get(url).query(query).bearer_auth(token))
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        subreddit: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let resp = self.request(path, query).await?.send().await.map_err(FetchError::Transport)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            if self.creds.is_some() {
                // force a new grant next time
                *self.token.lock().await = None;
            }
            return Err(FetchError::Auth(format!("r/{subreddit} returned {status}")));
        }
        if !status.is_success() {
            return Err(FetchError::Status { subreddit: subreddit.to_string(), status: status.as_u16() });
        }
        let body = resp.text().await.map_err(FetchError::Transport)?;
        serde_json::from_str(&body).map_err(|e| FetchError::Shape(format!("r/{subreddit}: {e}")))
    }
}

#[async_trait]
impl ContentSource for RedditClient {
    async fn top_posts(&self, subreddit: &str, limit: u32, window: TimeWindow) -> Result<Vec<Post>, FetchError> {
        if !is_valid_subreddit(subreddit) {
            return Err(FetchError::InvalidSubreddit(subreddit.to_string()));
        }
        let path = format!("/r/{subreddit}/top");
        let query = [("limit", limit.to_string()), ("t", window.as_str().to_string())];
        let listing: Listing<RawPost> = self.get_json(subreddit, &path, &query).await?;

        let posts = listing
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == "t3")
            .take(limit as usize)
            .map(|thing| Post::from_raw(thing.data, subreddit, &self.cfg.base_url))
            .collect::<Result<Vec<_>, _>>()?;
        if posts.is_empty() {
            return Err(FetchError::Empty(subreddit.to_string()));
        }
        Ok(posts)
    }

    async fn top_comments(&self, subreddit: &str, post_id: &str, limit: u32) -> Result<Vec<String>, FetchError> {
        if !is_valid_subreddit(subreddit) {
            return Err(FetchError::InvalidSubreddit(subreddit.to_string()));
        }
        let path = format!("/r/{subreddit}/comments/{post_id}");
        let query = [("sort", "top".to_string()), ("limit", limit.to_string()), ("depth", "1".to_string())];
        // [post listing, comment listing]
        let mut listings: Vec<Listing<RawComment>> = self.get_json(subreddit, &path, &query).await?;
        if listings.len() < 2 {
            return Err(FetchError::Shape(format!("r/{subreddit}: comment thread {post_id} had no comment listing")));
        }
        let comments = listings.swap_remove(1);
        Ok(qualifying_comments(comments.data.children, limit as usize))
    }
}
