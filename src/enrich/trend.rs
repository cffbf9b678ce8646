use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EnrichmentError;

const MAX_IDEAS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendCategory {
    Travel,
    Health,
    Finance,
    Tech,
}

impl TrendCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendCategory::Travel => "travel",
            TrendCategory::Health => "health",
            TrendCategory::Finance => "finance",
            TrendCategory::Tech => "tech",
        }
    }
}

impl fmt::Display for TrendCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for TrendCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "travel" => Ok(TrendCategory::Travel),
            "health" => Ok(TrendCategory::Health),
            "finance" => Ok(TrendCategory::Finance),
            "tech" | "technology" => Ok(TrendCategory::Tech),
            other => Err(format!("unknown category {other:?}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendInsight {
    pub title: String,
    pub description: String,
    pub category: TrendCategory,
    pub ideas: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawTrend {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    #[serde(default)]
    ideas: Value,
}

/// Validates the classifier's reply. Tolerates a markdown code fence and an
/// `ideas` field given either as an array or as a bulleted string.
pub fn parse_trend(content: &str) -> Result<TrendInsight, EnrichmentError> {
    let body = strip_code_fence(content);
    let raw: RawTrend = serde_json::from_str(body).map_err(|e| EnrichmentError::Shape(format!("not a JSON object: {e}")))?;

    let title = required(raw.title, "title")?;
    let description = required(raw.description, "description")?;
    let category = required(raw.category, "category")?
        .parse::<TrendCategory>()
        .map_err(EnrichmentError::Shape)?;

    let ideas: Vec<String> = match raw.ideas {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(clean_idea))
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s.lines().map(clean_idea).filter(|s| !s.is_empty()).collect(),
        _ => Vec::new(),
    };

    Ok(TrendInsight { title, description, category, ideas: ideas.into_iter().take(MAX_IDEAS).collect() })
}

fn required(v: Option<String>, field: &str) -> Result<String, EnrichmentError> {
    v.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EnrichmentError::Shape(format!("missing {field}")))
}

fn clean_idea(s: &str) -> String {
    s.trim().trim_start_matches(['-', '*', '•']).trim().to_string()
}

fn strip_code_fence(s: &str) -> &str {
    let t = s.trim();
    let Some(rest) = t.strip_prefix("```") else { return t };
    // drop an optional language tag on the opening fence, with or without a newline after it
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
