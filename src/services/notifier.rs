// src/services/notifier.rs

//! Outbound message delivery to caller-supplied URLs.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Capability to deliver a JSON message to a URL.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `payload` to `url` once.
    async fn deliver(&self, url: &str, payload: &Value) -> Result<()>;
}

/// Delivers messages as JSON POST requests.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, url: &str, payload: &Value) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::delivery(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::delivery(url, format!("status {status}")));
        }
        Ok(())
    }
}
