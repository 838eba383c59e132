//! Qdrant-backed retrieval.
//!
//! Queries are embedded through an OpenAI-compatible `/v1/embeddings`
//! endpoint, then matched against a Qdrant collection over its REST API.
//! Payloads are expected in the LangChain layout (`page_content` + `metadata`).

use super::{Passage, Retriever};
use crate::config::RetrievalConfig;
use crate::error::{EvalError, Result};
use crate::llm::join_url;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct SearchRequest {
    vector: Vec<f32>,
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<Value>,
}

/// Retriever backed by a Qdrant collection.
pub struct QdrantRetriever {
    client: Client,
    config: RetrievalConfig,
}

impl QdrantRetriever {
    pub fn new(config: RetrievalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    async fn embed(&self, query: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: [query],
        };

        let response = self
            .client
            .post(join_url(&self.config.embedding_api_base, "v1/embeddings"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EvalError::Api(format!(
                "Embedding request failed ({}): {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&body)?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EvalError::Api("No embedding in response".to_string()))
    }

    fn search_url(&self) -> String {
        join_url(
            &self.config.qdrant_url,
            &format!("collections/{}/points/search", self.config.collection),
        )
    }
}

#[async_trait]
impl Retriever for QdrantRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embed(query).await?;
        let request = SearchRequest {
            vector,
            limit: k,
            with_payload: true,
        };

        let response = self
            .client
            .post(self.search_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EvalError::Api(format!(
                "Qdrant search failed ({}): {}",
                status, body
            )));
        }

        let passages = parse_search(&body)?;
        debug!(count = passages.len(), "Qdrant returned passages");
        Ok(passages)
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(join_url(&self.config.qdrant_url, "collections"))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(EvalError::Api(format!(
                "Qdrant health check failed ({})",
                response.status()
            )))
        }
    }

    fn describe(&self) -> String {
        format!("qdrant:{}/{}", self.config.qdrant_url, self.config.collection)
    }
}

fn parse_search(body: &str) -> Result<Vec<Passage>> {
    let response: SearchResponse = serde_json::from_str(body)?;

    let passages = response
        .result
        .into_iter()
        .filter_map(|point| {
            let payload = point.payload?;
            let content = ["page_content", "content", "text"]
                .iter()
                .find_map(|key| payload.get(key).and_then(Value::as_str))?;

            let source = payload
                .get("metadata")
                .and_then(|m| m.get("source"))
                .or_else(|| payload.get("source"))
                .and_then(Value::as_str);

            let mut passage = Passage::new(content).with_score(point.score);
            if let Some(source) = source {
                passage = passage.with_source(source);
            }
            Some(passage)
        })
        .collect();

    Ok(passages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        let retriever = QdrantRetriever::new(RetrievalConfig::default()).unwrap();
        assert_eq!(
            retriever.search_url(),
            "http://localhost:6333/collections/law_library/points/search"
        );
    }

    #[test]
    fn test_parse_search_payloads() {
        let body = r#"{
            "result": [
                {"id": 1, "score": 0.91, "payload": {"page_content": "Article 9: everyone has the right to privacy.", "metadata": {"source": "code_civil.pdf"}}},
                {"id": 2, "score": 0.80, "payload": {"text": "Article 1240", "source": "code_civil.pdf"}},
                {"id": 3, "score": 0.50, "payload": {"other": "no text"}},
                {"id": 4, "score": 0.40}
            ],
            "status": "ok",
            "time": 0.001
        }"#;

        let passages = parse_search(body).unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].source.as_deref(), Some("code_civil.pdf"));
        assert_eq!(passages[0].score, Some(0.91));
        assert_eq!(passages[1].content, "Article 1240");
    }

    #[tokio::test]
    async fn test_zero_k_skips_backend() {
        let retriever = QdrantRetriever::new(RetrievalConfig {
            qdrant_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert!(retriever.retrieve("anything", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unresponsive_backend_times_out() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let retriever = QdrantRetriever::new(RetrievalConfig {
            embedding_api_base: format!("http://{}", addr),
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();

        let outcome = tokio::time::timeout(
            Duration::from_secs(10),
            retriever.retrieve("Article 9", 3),
        )
        .await
        .expect("request should be cut off by the client timeout");
        assert!(matches!(outcome, Err(EvalError::Http(_))));
    }
}
