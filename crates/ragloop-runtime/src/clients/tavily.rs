//! Tavily web search client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

use super::{ClientError, WebSearch, WebSnippet};
use crate::secrets::{ApiCredential, CredentialSource};

pub const TAVILY_API_KEY_ENV: &str = "TAVILY_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Web search backed by the Tavily search API.
pub struct TavilySearch {
    credential: ApiCredential,
    base_url: String,
    search_depth: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for TavilySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearch")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

impl TavilySearch {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_credential(ApiCredential::new(
            api_key,
            CredentialSource::Programmatic,
            "Tavily API key",
        ))
    }

    /// Create from JSON configuration with `TAVILY_API_KEY` fallback.
    ///
    /// Recognized keys: `api_key`, `base_url`, `search_depth`
    /// (`"basic"` or `"advanced"`).
    pub fn from_config(config: &JsonValue) -> Result<Self, ClientError> {
        let credential =
            ApiCredential::from_config_or_env(config, "api_key", TAVILY_API_KEY_ENV, "Tavily API key")?;
        let mut search = Self::with_credential(credential)?;

        if let Some(url) = config["base_url"].as_str() {
            search.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(depth) = config["search_depth"].as_str() {
            search.search_depth = depth.to_string();
        }
        Ok(search)
    }

    fn with_credential(credential: ApiCredential) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;

        Ok(Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            search_depth: "basic".to_string(),
            client,
        })
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<WebSnippet>, ClientError> {
        let request = SearchRequest {
            query,
            max_results: k,
            search_depth: &self.search_depth,
        };

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(self.credential.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| ClientError::Http(e.to_string()))?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ClientError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(snippets(body, k))
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

fn snippets(body: SearchResponse, k: usize) -> Vec<WebSnippet> {
    body.results
        .into_iter()
        .filter(|r| !r.content.trim().is_empty())
        .take(k)
        .map(|r| WebSnippet {
            text: r.content,
            url: r.url,
        })
        .collect()
}
