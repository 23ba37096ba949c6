//! KnowledgeBase trait and the retrieval-and-generation wire model.
//!
//! The knowledge service answers a query with generated text plus the
//! references it drew on. References arrive in several location shapes;
//! [`RetrievedReference::citation_sources`] resolves each one into a flat
//! list of [`CitationSource`] values.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::KnowledgeError;

/// Metadata keys that may carry a source link.
const LINK_METADATA_KEYS: [&str; 4] = ["url", "uri", "link", "source"];

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Metadata that is not a JSON object is ignored.
fn object_or_empty<'de, D>(
    deserializer: D,
) -> Result<serde_json::Map<String, serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

/// A retrieval-and-generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeRequest {
    /// The natural-language query
    pub query: String,

    /// Knowledge base (corpus) identifier
    pub knowledge_base_id: String,

    /// Fully qualified identifier of the generating model
    pub model_arn: String,

    /// How many supporting references to retrieve
    pub number_of_results: u32,

    /// Safety policy applied to generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardrail: Option<GuardrailRef>,
}

/// Reference to a safety policy (guardrail) and its version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailRef {
    pub guardrail_id: String,
    pub guardrail_version: String,
}

/// The service's answer: generated text plus citations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub output: GeneratedOutput,

    #[serde(default, deserialize_with = "null_as_default")]
    pub citations: Vec<Citation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl KnowledgeResponse {
    /// The generated text, trimmed.
    pub fn text(&self) -> &str {
        self.output.text.trim()
    }

    /// Every reference across every citation, in response order.
    pub fn references(&self) -> impl Iterator<Item = &RetrievedReference> {
        self.citations
            .iter()
            .flat_map(|c| c.retrieved_references.iter())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedOutput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

/// One span of generated text and the references backing it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub retrieved_references: Vec<RetrievedReference>,
}

/// A single retrieved source document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievedReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ReferenceContent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ReferenceLocation>,

    /// Free-form key/value metadata attached at ingestion time
    #[serde(default, deserialize_with = "object_or_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceContent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}

/// Where a reference lives. Normally exactly one shape is populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceLocation {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_location: Option<UriLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_location: Option<UrlLocation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confluence_location: Option<UrlLocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UriLocation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub uri: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlLocation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

/// A resolved citation link and the shape it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationSource {
    /// Object-storage document (`s3://...`)
    ObjectStorage { uri: String },
    /// Crawled web page
    Web { url: String },
    /// Wiki / document-store page
    Document { url: String },
    /// An http(s) link found under a well-known metadata key
    MetadataMatch { value: String },
}

impl CitationSource {
    pub fn link(&self) -> &str {
        match self {
            CitationSource::ObjectStorage { uri } => uri,
            CitationSource::Web { url } | CitationSource::Document { url } => url,
            CitationSource::MetadataMatch { value } => value,
        }
    }

    pub fn into_link(self) -> String {
        match self {
            CitationSource::ObjectStorage { uri } => uri,
            CitationSource::Web { url } | CitationSource::Document { url } => url,
            CitationSource::MetadataMatch { value } => value,
        }
    }
}

impl RetrievedReference {
    /// Resolve every link this reference carries: location shapes first,
    /// then metadata matches in metadata order. Empty values are skipped.
    pub fn citation_sources(&self) -> Vec<CitationSource> {
        let mut sources = Vec::new();

        if let Some(location) = &self.location {
            if let Some(s3) = &location.s3_location {
                sources.push(CitationSource::ObjectStorage {
                    uri: s3.uri.clone(),
                });
            }
            if let Some(web) = &location.web_location {
                sources.push(CitationSource::Web {
                    url: web.url.clone(),
                });
            }
            if let Some(doc) = &location.confluence_location {
                sources.push(CitationSource::Document {
                    url: doc.url.clone(),
                });
            }
        }

        for (key, value) in &self.metadata {
            let key = key.to_ascii_lowercase();
            if !LINK_METADATA_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Some(value) = value.as_str() {
                if value.starts_with("http://") || value.starts_with("https://") {
                    sources.push(CitationSource::MetadataMatch {
                        value: value.to_string(),
                    });
                }
            }
        }

        sources.retain(|s| !s.link().is_empty());
        sources
    }
}

/// The knowledge service contract.
///
/// Implementations must not block the runtime; the call suspends on I/O.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    async fn retrieve_and_generate(
        &self,
        request: KnowledgeRequest,
    ) -> std::result::Result<KnowledgeResponse, KnowledgeError>;
}
