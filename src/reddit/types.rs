use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::util::time::from_epoch_secs;

const MAX_COMMENT_CHARS: usize = 500;

static SUBREDDIT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_]{1,20}$").expect("static regex"));

/// Window for reddit's `top` listing (`t=` parameter).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(TimeWindow::Hour),
            "day" | "today" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            "year" => Ok(TimeWindow::Year),
            "all" => Ok(TimeWindow::All),
            other => Err(format!("unknown time window {other:?}")),
        }
    }
}

/// Strips a leading `r/` or `/r/` and surrounding whitespace.
pub fn normalize_subreddit(raw: &str) -> String {
    let s = raw.trim();
    let s = s.strip_prefix("/r/").or_else(|| s.strip_prefix("r/")).unwrap_or(s);
    s.trim_matches('/').to_string()
}

pub fn is_valid_subreddit(name: &str) -> bool {
    SUBREDDIT_NAME.is_match(name)
}

// Listing envelope: {"kind":"Listing","data":{"children":[{"kind":"t3","data":{...}}]}}
#[derive(Debug, Deserialize)]
pub struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<Thing<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct RawPost {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub created_utc: f64,
}

// "more" stubs share the t1 listing but carry no body
#[derive(Debug, Deserialize)]
pub struct RawComment {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// A validated top post.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Post {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub url: String,
    pub score: i64,
    pub num_comments: i64,
    pub created_utc: DateTime<Utc>,
}

impl Post {
    pub fn from_raw(raw: RawPost, subreddit: &str, site_base: &str) -> Result<Self, FetchError> {
        let title = raw.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).ok_or_else(|| {
            FetchError::MissingTitle { subreddit: subreddit.to_string(), post_id: raw.id.clone() }
        })?;
        let url = match (&raw.permalink, &raw.url) {
            (Some(permalink), _) if permalink.starts_with('/') => {
                format!("{}{}", site_base.trim_end_matches('/'), permalink)
            }
            (_, Some(url)) if !url.is_empty() => url.clone(),
            _ => format!("{}/comments/{}", site_base.trim_end_matches('/'), raw.id),
        };
        Ok(Post {
            id: raw.id,
            subreddit: subreddit.to_string(),
            title,
            url,
            score: raw.score,
            num_comments: raw.num_comments,
            created_utc: from_epoch_secs(raw.created_utc),
        })
    }
}

/// Keeps human comments with a body, truncated, up to `limit`.
pub fn qualifying_comments(children: Vec<Thing<RawComment>>, limit: usize) -> Vec<String> {
    children
        .into_iter()
        .filter(|c| c.kind == "t1")
        .filter(|c| c.data.author.as_deref() != Some("AutoModerator"))
        .filter_map(|c| c.data.body)
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty() && b != "[deleted]" && b != "[removed]")
        .map(|b| truncate_chars(&b, MAX_COMMENT_CHARS))
        .take(limit)
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max { s.to_string() } else { s.chars().take(max).collect() }
}
