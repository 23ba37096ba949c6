//! Knowledge retrieval: one retrieve-and-generate call per query, turned
//! into a [`RetrievalResult`].
//!
//! Every failure path degrades to the sentinel result. Nothing here returns
//! an error to the caller.

use regex::Regex;
use scout_config::AppConfig;
use scout_core::knowledge::{GuardrailRef, KnowledgeBase, KnowledgeRequest, KnowledgeResponse};
use scout_core::search::RetrievalResult;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Generated answers that mean "nothing found", compared case-insensitively
/// against the whole trimmed text.
const NO_INFORMATION_PHRASES: [&str; 4] = [
    "no information found",
    "no relevant information",
    "i don't have information",
    "no data available",
];

/// Boilerplate removed from summaries, longest first so that a longer
/// phrase is never left half-removed by a shorter one.
const BOILERPLATE_PHRASES: [&str; 4] = [
    "according to the search results",
    "based on the search results",
    "from the search results",
    "search results",
];

static BOILERPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = BOILERPLATE_PHRASES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){alternation}")).expect("valid boilerplate regex")
});

/// Request parameters fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub knowledge_base_id: String,
    pub model_arn: String,
    pub number_of_results: u32,
    pub guardrail: Option<GuardrailRef>,
    pub timeout: Duration,
}

impl RetrievalSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            knowledge_base_id: config.knowledge_base.id.clone().unwrap_or_default(),
            model_arn: config.model_arn(),
            number_of_results: config.knowledge_base.number_of_results,
            guardrail: config.guardrails.id.as_ref().map(|id| GuardrailRef {
                guardrail_id: id.clone(),
                guardrail_version: config.guardrails.version.clone(),
            }),
            timeout: config.response_timeout(),
        }
    }
}

pub struct KnowledgeRetriever {
    knowledge_base: Arc<dyn KnowledgeBase>,
    settings: RetrievalSettings,
}

impl KnowledgeRetriever {
    pub fn new(knowledge_base: Arc<dyn KnowledgeBase>, settings: RetrievalSettings) -> Self {
        Self {
            knowledge_base,
            settings,
        }
    }

    fn request(&self, query: &str) -> KnowledgeRequest {
        KnowledgeRequest {
            query: query.to_string(),
            knowledge_base_id: self.settings.knowledge_base_id.clone(),
            model_arn: self.settings.model_arn.clone(),
            number_of_results: self.settings.number_of_results,
            guardrail: self.settings.guardrail.clone(),
        }
    }

    /// Call the knowledge base, bounded by the configured timeout.
    async fn call(&self, query: &str) -> Option<KnowledgeResponse> {
        let call = self.knowledge_base.retrieve_and_generate(self.request(query));
        match tokio::time::timeout(self.settings.timeout, call).await {
            Ok(Ok(response)) => Some(response),
            Ok(Err(e)) => {
                warn!(backend = self.knowledge_base.name(), error = %e, "Knowledge base call failed");
                None
            }
            Err(_) => {
                warn!(
                    backend = self.knowledge_base.name(),
                    timeout_secs = self.settings.timeout.as_secs(),
                    "Knowledge base call timed out"
                );
                None
            }
        }
    }

    /// Retrieve and summarise knowledge for `query`. Never fails.
    pub async fn retrieve_and_generate(&self, query: &str) -> RetrievalResult {
        if query.trim().is_empty() {
            warn!("Empty query passed to knowledge retrieval");
            return RetrievalResult::sentinel();
        }

        let Some(response) = self.call(query).await else {
            return RetrievalResult::sentinel();
        };

        let text = response.text();
        if text.is_empty() || is_no_information(text) {
            info!("Knowledge base returned no usable content");
            return RetrievalResult::sentinel();
        }

        let citations = extract_citations(&response);
        let confidence = confidence_score(text, citations.len());
        let summary = clean_summary(text);

        debug!(
            citations = citations.len(),
            confidence,
            summary_len = summary.len(),
            "Knowledge retrieval complete"
        );

        RetrievalResult::new(summary, citations, confidence)
    }

    /// True when the knowledge base answers a test query at all; an empty
    /// or "nothing found" answer still counts as healthy.
    pub async fn health_check(&self) -> bool {
        let healthy = self.call("test").await.is_some();
        if !healthy {
            warn!("Knowledge base health check failed");
        }
        healthy
    }
}

fn is_no_information(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    NO_INFORMATION_PHRASES.contains(&lowered.as_str())
}

/// Every citation link in the response, deduplicated, first-seen order.
pub fn extract_citations(response: &KnowledgeResponse) -> Vec<String> {
    let mut seen = HashSet::new();
    response
        .references()
        .flat_map(|reference| reference.citation_sources())
        .map(|source| source.into_link())
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Additive heuristic in [0, 1] over the trimmed text and citation count.
pub fn confidence_score(text: &str, citation_count: usize) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    // Tenths keep the sums exact.
    let mut tenths: u32 = 3;

    let length = text.chars().count();
    if length > 100 {
        tenths += 2;
    }
    if length > 300 {
        tenths += 1;
    }

    if citation_count > 0 {
        tenths += 2;
    }
    if citation_count > 2 {
        tenths += 1;
    }
    if citation_count > 5 {
        tenths += 1;
    }

    (f64::from(tenths) / 10.0).min(1.0)
}

/// Strip boilerplate phrases, collapse whitespace, trim stray punctuation.
pub fn clean_summary(text: &str) -> String {
    let stripped = BOILERPLATE_RE.replace_all(text, "");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | ' '))
        .to_string()
}
