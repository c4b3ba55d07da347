//! Core domain records shared across promptkit pipelines.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline invocation (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Record identity
// ---------------------------------------------------------------------------

/// A persisted record with a natural key and an optional relevance score.
pub trait NaturalKey {
    /// Identity used for deduplication. `None` means "never a duplicate".
    fn natural_key(&self) -> Option<&str>;

    /// Score used when the sink sorts by relevance.
    fn relevance(&self) -> f64 {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Leads
// ---------------------------------------------------------------------------

/// An Instagram business lead.
///
/// Decoding is lenient: nulls become defaults, and a `found_at` that is not
/// a recognizable timestamp is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredLead")]
pub struct Lead {
    pub profile_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_handle: Option<String>,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub niche: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_at: Option<DateTime<Utc>>,
    /// Fields written by other tools, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// On-disk shape of a [`Lead`] as written by this or other tools.
#[derive(Deserialize)]
struct StoredLead {
    profile_url: String,
    #[serde(default)]
    instagram_handle: Option<String>,
    #[serde(default)]
    business_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    relevance_score: Option<f64>,
    #[serde(default)]
    niche: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    found_at: Option<serde_json::Value>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl From<StoredLead> for Lead {
    fn from(stored: StoredLead) -> Self {
        let mut extra = stored.extra;
        let found_at = match stored.found_at {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(raw)) => match parse_timestamp(&raw) {
                Some(at) => Some(at),
                None => {
                    extra.insert("found_at".into(), serde_json::Value::String(raw));
                    None
                }
            },
            Some(other) => {
                extra.insert("found_at".into(), other);
                None
            }
        };

        Self {
            profile_url: stored.profile_url,
            instagram_handle: stored.instagram_handle,
            business_name: stored.business_name.unwrap_or_default(),
            description: stored.description.unwrap_or_default(),
            relevance_score: stored.relevance_score.unwrap_or_default(),
            niche: stored.niche.unwrap_or_default(),
            location: stored.location.unwrap_or_default(),
            found_at,
            extra,
        }
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

impl NaturalKey for Lead {
    fn natural_key(&self) -> Option<&str> {
        self.instagram_handle
            .as_deref()
            .or(Some(self.profile_url.as_str()))
    }

    fn relevance(&self) -> f64 {
        self.relevance_score
    }
}

/// A lead reduced to its profile URL, numbered in file order.
///
/// Full lead records decode too: their other fields are dropped and the
/// number is assigned on the next save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalLead {
    #[serde(default)]
    pub number: usize,
    pub profile_url: String,
}

impl NaturalKey for MinimalLead {
    fn natural_key(&self) -> Option<&str> {
        Some(&self.profile_url)
    }
}

// ---------------------------------------------------------------------------
// Research
// ---------------------------------------------------------------------------

/// Research plan produced by the query-generation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPlan {
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default)]
    pub topic_analysis: String,
    #[serde(default)]
    pub search_queries: Vec<String>,
}

/// How a single search request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Answer(String),
    Error(String),
}

/// A search query paired with its (possibly failed) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFinding {
    pub query: String,
    pub outcome: SearchOutcome,
}

impl SearchFinding {
    /// Whether the search produced an answer.
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Answer(_))
    }

    /// Response text as handed to the synthesis stage.
    pub fn response_text(&self) -> String {
        match &self.outcome {
            SearchOutcome::Answer(text) => text.clone(),
            SearchOutcome::Error(message) => format!("Error: {message}"),
        }
    }
}

impl Serialize for SearchFinding {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("SearchFinding", 2)?;
        s.serialize_field("query", &self.query)?;
        s.serialize_field("response", &self.response_text())?;
        s.end()
    }
}

// ---------------------------------------------------------------------------
// Outreach, tasks, videos
// ---------------------------------------------------------------------------

/// Market research and outreach messages for one search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachDraft {
    pub query: String,
    pub search_results: String,
    pub outreach_messages: String,
}

/// A user task with its LLM-assigned priority text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub priority: String,
}

/// A video row as scraped from a channel page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub video_title: String,
    #[serde(default)]
    pub views: String,
    #[serde(default)]
    pub upload_date: String,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// File path → full file contents, sorted by path.
pub type Snapshot = BTreeMap<String, String>;
