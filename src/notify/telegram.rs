use crate::error::NotifyError;
use crate::notify::Notifier;
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages through the Telegram Bot API
pub struct TelegramNotifier {
    client: Client,
    url: String,
    chat_id: String,
    retry: RetryPolicy,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: impl Into<String>, retry: RetryPolicy) -> Result<Self> {
        Self::with_api_base(API_BASE, token, chat_id, retry)
    }

    pub fn with_api_base(
        api_base: &str,
        token: &str,
        chat_id: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create Telegram HTTP client")?;

        Ok(Self {
            client,
            url: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), token),
            chat_id: chat_id.into(),
            retry,
        })
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        let reply: ApiResponse = response.json().await.map_err(|e| {
            // Non-JSON error pages still carry a useful status code
            if status.is_success() {
                NotifyError::Http(e)
            } else {
                NotifyError::from_reply(status, status.to_string())
            }
        })?;

        check_reply(status, reply)
    }
}

fn check_reply(status: reqwest::StatusCode, reply: ApiResponse) -> Result<(), NotifyError> {
    if status.is_success() && reply.ok {
        return Ok(());
    }
    Err(NotifyError::from_reply(
        status,
        reply.description.unwrap_or_else(|| status.to_string()),
    ))
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, message: &str) -> Result<(), NotifyError> {
        self.retry
            .run("sendMessage", move || self.send(message))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Retryable;
    use reqwest::StatusCode;

    #[test]
    fn test_request_body_shape() {
        let body = SendMessage {
            chat_id: "-100123",
            text: "🏠 <b>hi</b>",
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["chat_id"], "-100123");
        assert_eq!(value["parse_mode"], "HTML");
        assert_eq!(value["disable_web_page_preview"], true);
    }

    #[test]
    fn test_url_from_token() {
        let notifier =
            TelegramNotifier::with_api_base("http://localhost:8081/", "123:abc", "42", RetryPolicy::none())
                .unwrap();
        assert_eq!(notifier.url, "http://localhost:8081/bot123:abc/sendMessage");
    }

    #[test]
    fn test_check_reply() {
        let ok: ApiResponse = serde_json::from_str(r#"{"ok":true,"result":{}}"#).unwrap();
        assert!(check_reply(StatusCode::OK, ok).is_ok());

        let rejected: ApiResponse = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: can't parse entities"}"#,
        )
        .unwrap();
        match check_reply(StatusCode::BAD_REQUEST, rejected) {
            Err(NotifyError::Rejected(msg)) => assert!(msg.contains("can't parse entities")),
            other => panic!("unexpected {other:?}"),
        }

        let throttled: ApiResponse = serde_json::from_str(
            r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 5"}"#,
        )
        .unwrap();
        let err = check_reply(StatusCode::TOO_MANY_REQUESTS, throttled).unwrap_err();
        assert!(err.is_retryable());
    }
}
