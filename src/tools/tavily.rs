use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use ureq::Agent;

use crate::collaborators::{SearchHit, WebSearch};
use crate::step::StepError;
use crate::tools::http;

pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: Option<String>,
    content: String,
}

/// Web search through the Tavily API.
pub struct TavilySearch {
    agent: Agent,
    endpoint: String,
    api_key: String,
    max_results: usize,
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>, max_results: usize, timeout: Duration) -> Self {
        Self {
            agent: http::agent(timeout),
            endpoint: TAVILY_ENDPOINT.to_string(),
            api_key: api_key.into(),
            max_results,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl WebSearch for TavilySearch {
    fn search(&self, query: &str) -> Result<Vec<SearchHit>, StepError> {
        let request = TavilyRequest {
            query,
            max_results: self.max_results,
            search_depth: "basic",
            include_answer: false,
        };
        let response: TavilyResponse =
            http::post_json(&self.agent, &self.endpoint, Some(&self.api_key), &request)?;
        debug!(results = response.results.len(), "tavily search");

        Ok(response
            .results
            .into_iter()
            .map(|r| SearchHit {
                content: r.content,
                url: r.url,
            })
            .collect())
    }
}
