//! Webhook notification delivery.
//!
//! New articles are announced one message per article to a text-message
//! webhook (Feishu-style payload). A missing webhook URL turns delivery
//! into a logged no-op so the monitor can run record-only.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::app::{Result, WatchpostError};
use crate::config::WebhookConfig;

/// Trait for notification delivery
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce one new article.
    async fn send(&self, title: &str, url: &str) -> Result<()>;

    /// Report a pipeline failure out-of-band.
    async fn send_error(&self, message: &str) -> Result<()>;
}

/// Posts text messages to the configured webhook endpoints.
pub struct WebhookNotifier {
    client: Client,
    config: WebhookConfig,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("watchpost/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self { client, config }
    }

    async fn post(&self, endpoint: &str, payload: &serde_json::Value) -> Result<()> {
        let response = self.client.post(endpoint).json(payload).send().await?;
        response.error_for_status_ref()?;

        // Feishu acknowledges with 200 even when it rejects the message;
        // the verdict is the body's `code` field.
        let body = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or_default();
        check_response_code(&body)?;

        Ok(())
    }
}

fn check_response_code(body: &serde_json::Value) -> Result<()> {
    match body.get("code").and_then(|c| c.as_i64()) {
        Some(code) if code != 0 => {
            let msg = body.get("msg").and_then(|m| m.as_str()).unwrap_or("");
            Err(WatchpostError::Other(format!(
                "Webhook rejected message (code {}): {}",
                code, msg
            )))
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, title: &str, url: &str) -> Result<()> {
        let Some(endpoint) = self.config.article_endpoint() else {
            debug!("No webhook configured, skipping notification for {}", url);
            return Ok(());
        };

        let payload = message_payload(&article_message(title, url));
        self.post(endpoint, &payload).await?;
        info!("Notified webhook about {}", url);

        Ok(())
    }

    async fn send_error(&self, message: &str) -> Result<()> {
        let Some(endpoint) = self.config.error_endpoint() else {
            debug!("No webhook configured, dropping error report: {}", message);
            return Ok(());
        };

        let payload = message_payload(&format!("[watchpost] pipeline error: {}", message));
        self.post(endpoint, &payload).await?;

        Ok(())
    }
}

fn article_message(title: &str, url: &str) -> String {
    format!("New article: {}\n{}", title, url)
}

/// Text-message payload in the shape the webhook expects:
/// `{"msg_type": "text", "content": {"text": ...}}`.
fn message_payload(text: &str) -> serde_json::Value {
    json!({
        "msg_type": "text",
        "content": {
            "text": text,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let payload = message_payload(&article_message(
            "Firmware 1.2 released",
            "https://bbs.robomaster.com/article/42",
        ));

        assert_eq!(payload["msg_type"], "text");
        let text = payload["content"]["text"].as_str().unwrap();
        assert!(text.contains("Firmware 1.2 released"));
        assert!(text.contains("https://bbs.robomaster.com/article/42"));
    }

    #[test]
    fn test_response_code_zero_is_ok() {
        check_response_code(&json!({"code": 0, "msg": "success"})).unwrap();
        // Endpoints that answer with an empty or non-JSON body pass too.
        check_response_code(&serde_json::Value::Null).unwrap();
    }

    #[test]
    fn test_nonzero_response_code_is_an_error() {
        let err = check_response_code(&json!({"code": 19001, "msg": "param invalid"}))
            .unwrap_err();
        assert!(err.to_string().contains("19001"));
        assert!(err.to_string().contains("param invalid"));
    }

    #[tokio::test]
    async fn test_unconfigured_webhook_is_a_no_op() {
        let notifier = WebhookNotifier::new(WebhookConfig::default());

        notifier
            .send("Title", "https://bbs.robomaster.com/article/1")
            .await
            .unwrap();
        notifier.send_error("boom").await.unwrap();
    }
}
