//! The request/response model of the search pipeline.
//!
//! [`SearchRequest`] and [`SearchResponse`] are the wire contract. The two
//! intermediate results carry partial failure as ordinary data, so a
//! degraded upstream never has to be expressed as an error.

use serde::{Deserialize, Serialize};

/// Summary substituted whenever retrieval yields nothing usable.
pub const NO_SUMMARY: &str = "No AI summary could be found for the specified query";

/// An incoming search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Natural-language search query
    #[serde(rename = "search_query")]
    pub query: String,

    /// User identifier for personalisation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
        }
    }

    pub fn for_user(query: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: Some(user_id.into()),
        }
    }
}

/// The only response shape the service ever returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// User-specific content, or empty
    #[serde(default)]
    pub personalised: String,

    /// General summary from the knowledge base, or a fixed message
    #[serde(default)]
    pub summary: String,

    /// Source URLs and citations
    #[serde(default)]
    pub links: Vec<String>,
}

impl SearchResponse {
    /// A response that carries only a message in `summary`.
    pub fn message(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }
}

/// Outcome of a knowledge-base lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub summary: String,

    /// Unique source links, first-seen order
    pub citations: Vec<String>,

    /// Heuristic answer quality in [0, 1]
    pub confidence: f64,
}

impl RetrievalResult {
    /// The fixed "nothing found" result.
    pub fn sentinel() -> Self {
        Self {
            summary: NO_SUMMARY.to_string(),
            citations: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Build a result, collapsing to the sentinel when there is no summary.
    pub fn new(summary: String, citations: Vec<String>, confidence: f64) -> Self {
        if summary.trim().is_empty() {
            return Self::sentinel();
        }
        Self {
            summary,
            citations,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.summary == NO_SUMMARY && self.citations.is_empty()
    }
}

/// Outcome of a personalisation attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalisationResult {
    pub content: String,

    /// Marker naming the mechanism that produced the content
    pub tool_used: String,

    /// True exactly when `content` is non-empty
    pub success: bool,
}

impl PersonalisationResult {
    /// The empty, unsuccessful result.
    pub fn unsuccessful() -> Self {
        Self::default()
    }

    /// Wrap produced content; success follows from non-empty trimmed text.
    pub fn produced(content: &str, tool_used: impl Into<String>) -> Self {
        let content = content.trim().to_string();
        Self {
            success: !content.is_empty(),
            content,
            tool_used: tool_used.into(),
        }
    }
}
