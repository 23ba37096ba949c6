//! HTTP client for a retrieval-and-generation knowledge service.
//!
//! Posts the RetrieveAndGenerate request body to `{endpoint}/retrieveAndGenerate`
//! and deserializes the response into [`KnowledgeResponse`]. Any gateway that
//! fronts a managed knowledge base with this JSON shape can be used.

use async_trait::async_trait;
use scout_config::AppConfig;
use scout_core::error::KnowledgeError;
use scout_core::knowledge::{KnowledgeBase, KnowledgeRequest, KnowledgeResponse};
use std::time::Duration;
use tracing::{debug, warn};

pub struct HttpKnowledgeBase {
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpKnowledgeBase {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, KnowledgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KnowledgeError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, KnowledgeError> {
        Self::new(
            config.knowledge_base.endpoint.clone(),
            config.knowledge_base.api_key.clone(),
            config.response_timeout(),
        )
    }

    /// Build the RetrieveAndGenerate request body.
    fn request_body(request: &KnowledgeRequest) -> serde_json::Value {
        let mut kb_config = serde_json::json!({
            "knowledgeBaseId": request.knowledge_base_id,
            "modelArn": request.model_arn,
            "retrievalConfiguration": {
                "vectorSearchConfiguration": {
                    "numberOfResults": request.number_of_results,
                }
            },
        });

        if let Some(guardrail) = &request.guardrail {
            kb_config["generationConfiguration"] = serde_json::json!({
                "guardrailConfiguration": guardrail,
            });
        }

        serde_json::json!({
            "input": { "text": request.query },
            "retrieveAndGenerateConfiguration": {
                "type": "KNOWLEDGE_BASE",
                "knowledgeBaseConfiguration": kb_config,
            },
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> KnowledgeError {
        if e.is_timeout() {
            KnowledgeError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            KnowledgeError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    fn name(&self) -> &str {
        "http_knowledge_base"
    }

    async fn retrieve_and_generate(
        &self,
        request: KnowledgeRequest,
    ) -> std::result::Result<KnowledgeResponse, KnowledgeError> {
        if request.knowledge_base_id.trim().is_empty() {
            return Err(KnowledgeError::NotConfigured(
                "knowledge base id is empty".into(),
            ));
        }

        let url = format!("{}/retrieveAndGenerate", self.endpoint);
        let body = Self::request_body(&request);

        debug!(
            knowledge_base = %request.knowledge_base_id,
            results = request.number_of_results,
            guardrail = request.guardrail.is_some(),
            "Sending retrieve-and-generate request"
        );

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status().as_u16();

        if status == 429 {
            return Err(KnowledgeError::Throttled);
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Knowledge base returned error");
            return Err(KnowledgeError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        response
            .json::<KnowledgeResponse>()
            .await
            .map_err(|e| KnowledgeError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use scout_core::knowledge::GuardrailRef;

    fn request() -> KnowledgeRequest {
        KnowledgeRequest {
            query: "What is cloud computing?".into(),
            knowledge_base_id: "KB123".into(),
            model_arn: "arn:aws:bedrock:us-east-1::foundation-model/claude-3-7-sonnet".into(),
            number_of_results: 10,
            guardrail: Some(GuardrailRef {
                guardrail_id: "gr-1".into(),
                guardrail_version: "DRAFT".into(),
            }),
        }
    }

    fn client(base: &str, api_key: Option<&str>) -> HttpKnowledgeBase {
        HttpKnowledgeBase::new(base, api_key.map(String::from), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn request_body_matches_wire_shape() {
        let body = HttpKnowledgeBase::request_body(&request());
        assert_eq!(body["input"]["text"], "What is cloud computing?");
        let kb = &body["retrieveAndGenerateConfiguration"]["knowledgeBaseConfiguration"];
        assert_eq!(body["retrieveAndGenerateConfiguration"]["type"], "KNOWLEDGE_BASE");
        assert_eq!(kb["knowledgeBaseId"], "KB123");
        assert_eq!(
            kb["retrievalConfiguration"]["vectorSearchConfiguration"]["numberOfResults"],
            10
        );
        assert_eq!(
            kb["generationConfiguration"]["guardrailConfiguration"]["guardrailId"],
            "gr-1"
        );
        assert_eq!(
            kb["generationConfiguration"]["guardrailConfiguration"]["guardrailVersion"],
            "DRAFT"
        );
    }

    #[test]
    fn request_body_omits_generation_config_without_guardrail() {
        let mut req = request();
        req.guardrail = None;
        let body = HttpKnowledgeBase::request_body(&req);
        let kb = &body["retrieveAndGenerateConfiguration"]["knowledgeBaseConfiguration"];
        assert!(kb.get("generationConfiguration").is_none());
    }

    #[tokio::test]
    async fn retrieves_text_and_citations() {
        let router = Router::new().route(
            "/retrieveAndGenerate",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(
                    headers.get("authorization").unwrap().to_str().unwrap(),
                    "Bearer kb-key"
                );
                assert_eq!(body["input"]["text"], "What is cloud computing?");
                Json(serde_json::json!({
                    "output": { "text": "Cloud computing offers X." },
                    "citations": [{
                        "retrievedReferences": [
                            { "location": { "type": "WEB", "webLocation": { "url": "https://a.example/doc" } } }
                        ]
                    }],
                    "sessionId": "s-1"
                }))
            }),
        );
        let base = test_server::spawn(router).await;

        let response = client(&base, Some("kb-key"))
            .retrieve_and_generate(request())
            .await
            .unwrap();
        assert_eq!(response.text(), "Cloud computing offers X.");
        assert_eq!(response.references().count(), 1);
    }

    #[tokio::test]
    async fn throttling_and_server_errors_map_to_knowledge_errors() {
        let router = Router::new()
            .route(
                "/throttled/retrieveAndGenerate",
                post(|| async { StatusCode::TOO_MANY_REQUESTS }),
            )
            .route(
                "/failing/retrieveAndGenerate",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            );
        let base = test_server::spawn(router).await;

        let err = client(&format!("{base}/throttled"), None)
            .retrieve_and_generate(request())
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::Throttled));

        let err = client(&format!("{base}/failing"), None)
            .retrieve_and_generate(request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::ApiError {
                status_code: 500,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn non_json_body_is_invalid_response() {
        let router = Router::new().route("/retrieveAndGenerate", post(|| async { "not json" }));
        let base = test_server::spawn(router).await;

        let err = client(&base, None)
            .retrieve_and_generate(request())
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn empty_knowledge_base_id_is_rejected_without_a_call() {
        let mut req = request();
        req.knowledge_base_id = " ".into();
        let err = client("http://127.0.0.1:1", None)
            .retrieve_and_generate(req)
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let router = Router::new().route(
            "/retrieveAndGenerate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(serde_json::json!({}))
            }),
        );
        let base = test_server::spawn(router).await;

        let kb = HttpKnowledgeBase::new(&base, None, Duration::from_millis(100)).unwrap();
        let err = kb.retrieve_and_generate(request()).await.unwrap_err();
        assert!(matches!(err, KnowledgeError::Timeout { .. }));
    }
}
