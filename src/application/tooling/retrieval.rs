use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::RetrievalConfig;

/// Thin client for the question/answer retrieval service backing the
/// `milvus_search` tool.
#[derive(Debug, Clone)]
pub struct RetrievalClient {
    endpoint: String,
    top_k: usize,
    http: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("failed to reach retrieval service")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetrievalHit {
    pub question: String,
    pub answer: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<RetrievalHit>,
}

impl RetrievalClient {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            top_k: config.top_k,
            http: reqwest::Client::new(),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<RetrievalHit>, RetrievalError> {
        let url = format!("{}/search", self.endpoint.trim_end_matches('/'));
        debug!(%url, top_k = self.top_k, "Searching retrieval service");
        let response = self
            .http
            .post(&url)
            .json(&SearchRequest {
                query,
                top_k: self.top_k,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;
        Ok(response.hits)
    }
}

/// Renders hits into the reference block the model reads. Hits are numbered
/// from one; an empty slice still produces the block header so the model can
/// tell the search ran and found nothing.
pub fn format_hits(hits: &[RetrievalHit]) -> String {
    let mut rendered = String::from("\n【资料】");
    for (index, hit) in hits.iter().enumerate() {
        rendered.push_str(&format!("\n ########### 资料({}) ###########", index + 1));
        rendered.push_str("\n提问：");
        rendered.push_str(&hit.question);
        rendered.push_str("\n解答：");
        rendered.push_str(&hit.answer);
    }
    rendered
}
