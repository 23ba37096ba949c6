//! Response assembly.

use scout_core::search::{NO_SUMMARY, PersonalisationResult, RetrievalResult, SearchResponse};

/// Merge the two upstream outcomes into the response shape.
///
/// A missing or empty retrieval yields the "no summary" message with no
/// links. Personalised content is included only when it succeeded.
pub fn assemble(
    retrieval: Option<RetrievalResult>,
    personalisation: Option<PersonalisationResult>,
) -> SearchResponse {
    let (summary, links) = match retrieval {
        Some(r) if !r.summary.trim().is_empty() => (r.summary, r.citations),
        _ => (NO_SUMMARY.to_string(), Vec::new()),
    };

    let personalised = personalisation
        .filter(|p| p.success)
        .map(|p| p.content)
        .unwrap_or_default();

    SearchResponse {
        personalised,
        summary,
        links,
    }
}
