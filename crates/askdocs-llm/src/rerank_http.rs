//! Cross-encoder reranking over HTTP.
//!
//! Speaks the text-embeddings-inference `/rerank` shape: one query and a list
//! of texts in, `[{index, score}]` out. Pairs are grouped by query so a single
//! rerank pass costs one request.

use std::time::Duration;

use anyhow::{anyhow, Result};
use askdocs_core::error::Error;
use askdocs_core::traits::RelevanceJudge;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: Vec<&'a str>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RerankHit {
    pub index: usize,
    pub score: f32,
}

pub struct HttpRerankJudge {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpRerankJudge {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: format!("{}/rerank", base_url.trim_end_matches('/')) })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn rerank(&self, query: &str, texts: Vec<&str>) -> Result<Vec<f32>> {
        let expected = texts.len();
        let response = self
            .client
            .post(&self.url)
            .json(&RerankRequest { query, texts })
            .send()
            .map_err(|e| {
                warn!(error = %e, url = %self.url, "reranker unreachable");
                anyhow!("reranker HTTP error: {e}")
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().unwrap_or_default();
            return Err(anyhow!("reranker returned {status}: {text}"));
        }
        let hits: Vec<RerankHit> = response.json().map_err(|e| anyhow!("reranker JSON parse error: {e}"))?;
        debug!(hits = hits.len(), "rerank response");
        scores_from_hits(expected, &hits)
    }
}

/// Places each hit's score at its index. Every position must be covered once.
pub fn scores_from_hits(expected: usize, hits: &[RerankHit]) -> Result<Vec<f32>> {
    let mut scores = vec![None; expected];
    for hit in hits {
        let slot = scores
            .get_mut(hit.index)
            .ok_or_else(|| Error::collaborator("reranker", format!("index {} out of range", hit.index)))?;
        *slot = Some(hit.score);
    }
    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or_else(|| Error::collaborator("reranker", format!("no score for text {i}")).into()))
        .collect()
}

impl RelevanceJudge for HttpRerankJudge {
    fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        let mut scores = vec![0.0; pairs.len()];
        let mut queries: Vec<&str> = Vec::new();
        for (query, _) in pairs {
            if !queries.contains(&query.as_str()) {
                queries.push(query);
            }
        }
        for query in queries {
            let positions: Vec<usize> = (0..pairs.len()).filter(|&i| pairs[i].0 == query).collect();
            let texts = positions.iter().map(|&i| pairs[i].1.as_str()).collect();
            for (pos, score) in positions.into_iter().zip(self.rerank(query, texts)?) {
                scores[pos] = score;
            }
        }
        Ok(scores)
    }
}
