use crate::error::FetchError;
use crate::models::Listing;
use crate::retry::RetryPolicy;
use crate::scrapers::traits::SearchApi;
use crate::scrapers::types::SearchFilters;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.divar.ir/v8/postlist/w/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    list_widgets: Vec<Listing>,
}

/// Client for the Divar post-list search endpoint
pub struct DivarClient {
    client: Client,
    endpoint: String,
    filters: SearchFilters,
    retry: RetryPolicy,
}

impl DivarClient {
    /// Create a new client. `authorization` becomes the `Authorization` header when set.
    pub fn new(
        endpoint: impl Into<String>,
        filters: SearchFilters,
        authorization: Option<&str>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=UTF-8"),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert("X-Standard-Divar-Error", HeaderValue::from_static("true"));
        headers.insert("X-Render-Type", HeaderValue::from_static("CSR"));
        if let Some(auth) = authorization {
            let value = HeaderValue::from_str(auth).context("Invalid authorization header value")?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            filters,
            retry,
        })
    }

    async fn request(&self, cursor: Option<&str>, page: u32) -> Result<Vec<Listing>, FetchError> {
        let payload = self.filters.payload(cursor, page);
        debug!(page, cursor = ?cursor, "POST {}", self.endpoint);

        let response = self.client.post(&self.endpoint).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Divar returned status: {}", status);
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        debug!("Downloaded {} bytes of JSON", body.len());

        let parsed: SearchResponse = serde_json::from_str(&body)?;
        Ok(parsed.list_widgets)
    }
}

#[async_trait]
impl SearchApi for DivarClient {
    async fn search(&self, cursor: Option<&str>, page: u32) -> Result<Vec<Listing>, FetchError> {
        self.retry
            .run("search request", move || self.request(cursor, page))
            .await
    }

    fn source_name(&self) -> &'static str {
        "Divar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_parsing() {
        let body = json!({
            "list_widgets": [
                { "data": { "title": "a", "action": { "payload": { "token": "t1" } } } },
                { "data": { "title": "b", "action": { "payload": { "token": "t2" } } } }
            ],
            "pagination": { "has_next_page": true }
        })
        .to_string();

        let parsed: SearchResponse = serde_json::from_str(&body).unwrap();
        let tokens: Vec<_> = parsed.list_widgets.iter().map(|l| l.token()).collect();
        assert_eq!(tokens, vec![Some("t1"), Some("t2")]);
    }

    #[test]
    fn test_response_without_widgets_is_empty() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.list_widgets.is_empty());
    }

    #[test]
    fn test_rejects_bad_authorization_header() {
        let result = DivarClient::new(
            DEFAULT_ENDPOINT,
            SearchFilters::default(),
            Some("bad\nvalue"),
            Duration::from_secs(10),
            RetryPolicy::none(),
        );
        assert!(result.is_err());
    }
}
