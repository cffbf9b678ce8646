use std::time::{Duration, Instant};

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::config::RedditCredentials;
use crate::error::FetchError;

// refresh a minute early so an in-flight request never carries a stale token
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone, Debug)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AccessToken {
    pub fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

/// Password grant for a reddit script app.
pub async fn request_token(
    http: &HttpClient,
    base_url: &str,
    creds: &RedditCredentials,
) -> Result<AccessToken, FetchError> {
    let url = format!("{}/api/v1/access_token", base_url.trim_end_matches('/'));
    let resp = http
        .post(url)
        .basic_auth(&creds.client_id, Some(&creds.client_secret))
        .form(&[
            ("grant_type", "password"),
            ("username", creds.username.as_str()),
            ("password", creds.password.as_str()),
        ])
        .send()
        .await
        .map_err(FetchError::Transport)?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Auth(format!("token endpoint returned {status}")));
    }
    let body = resp.text().await.map_err(FetchError::Transport)?;
    let parsed: TokenResponse =
        serde_json::from_str(&body).map_err(|e| FetchError::Auth(format!("unreadable token response: {e}")))?;

    // reddit reports bad credentials as 200 {"error": "invalid_grant"}
    if let Some(err) = parsed.error {
        return Err(FetchError::Auth(err));
    }
    let value = parsed.access_token.ok_or_else(|| FetchError::Auth("token response had no access_token".into()))?;
    let ttl = Duration::from_secs(parsed.expires_in.unwrap_or(3600));
    Ok(AccessToken { value, expires_at: Instant::now() + ttl })
}
