//! FCM push gateway — the one external call surface of the fire path.
//!
//! Uses the legacy FCM HTTP API: one endpoint for topic/single-token
//! sends (`to`) and multicast (`registration_ids`), plus the Instance ID
//! API for topic subscription management. The two call shapes have
//! different response bodies; `send_to_tokens` unpacks the multicast
//! `results` array into per-token outcomes so the dispatcher can report
//! partial failure.

use async_trait::async_trait;
use dongari_core::config::FcmConfig;
use dongari_core::error::{DongariError, Result};

/// Per-token result of a multicast send.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub token: String,
    pub ok: bool,
    pub error: Option<String>,
}

/// Push provider seam. The engine only ever talks to this trait; tests
/// substitute a recording mock.
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// Broadcast to a topic.
    async fn send_to_topic(&self, topic: &str, title: &str, body: &str) -> Result<()>;

    /// Send to a single device.
    async fn send_to_token(&self, token: &str, title: &str, body: &str) -> Result<()>;

    /// Multicast. Ok(outcomes) preserves per-token success/failure; Err
    /// means the whole call failed (outage, timeout).
    async fn send_to_tokens(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
    ) -> Result<Vec<SendOutcome>>;

    /// Subscribe devices to a broadcast topic.
    async fn subscribe(&self, tokens: &[String], topic: &str) -> Result<()>;

    /// Unsubscribe devices from a broadcast topic.
    async fn unsubscribe(&self, tokens: &[String], topic: &str) -> Result<()>;
}

/// FCM client over reqwest.
pub struct FcmClient {
    client: reqwest::Client,
    config: FcmConfig,
}

impl FcmClient {
    pub fn new(config: FcmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.timeout_secs)
    }

    fn auth_header(&self) -> String {
        format!("key={}", self.config.server_key)
    }

    /// POST a send payload and return the parsed response body.
    async fn post_send(&self, payload: serde_json::Value) -> Result<serde_json::Value> {
        let resp = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", self.auth_header())
            .json(&payload)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| DongariError::Provider(format!("FCM send failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DongariError::Provider(format!("FCM error {status}: {body}")));
        }

        resp.json()
            .await
            .map_err(|e| DongariError::Provider(format!("FCM response parse failed: {e}")))
    }
}

#[async_trait]
impl PushGateway for FcmClient {
    async fn send_to_topic(&self, topic: &str, title: &str, body: &str) -> Result<()> {
        let response = self
            .post_send(serde_json::json!({
                "to": format!("/topics/{topic}"),
                "notification": {"title": title, "body": body},
            }))
            .await?;
        tracing::debug!("FCM topic send to '{}' ok: {}", topic, response);
        Ok(())
    }

    async fn send_to_token(&self, token: &str, title: &str, body: &str) -> Result<()> {
        let response = self
            .post_send(serde_json::json!({
                "to": token,
                "notification": {"title": title, "body": body},
            }))
            .await?;
        if response["failure"].as_u64().unwrap_or(0) > 0 {
            let reason = response["results"][0]["error"]
                .as_str()
                .unwrap_or("unknown")
                .to_string();
            return Err(DongariError::Provider(format!("FCM rejected token: {reason}")));
        }
        Ok(())
    }

    async fn send_to_tokens(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
    ) -> Result<Vec<SendOutcome>> {
        let response = self
            .post_send(serde_json::json!({
                "registration_ids": tokens,
                "notification": {"title": title, "body": body},
            }))
            .await?;

        // results[] is positionally aligned with registration_ids.
        let results = response["results"].as_array().cloned().unwrap_or_default();
        let outcomes = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                let error = results
                    .get(i)
                    .and_then(|r| r["error"].as_str())
                    .map(|s| s.to_string());
                SendOutcome {
                    token: token.clone(),
                    ok: error.is_none(),
                    error,
                }
            })
            .collect();
        Ok(outcomes)
    }

    async fn subscribe(&self, tokens: &[String], topic: &str) -> Result<()> {
        self.manage_topic("batchAdd", tokens, topic).await
    }

    async fn unsubscribe(&self, tokens: &[String], topic: &str) -> Result<()> {
        self.manage_topic("batchRemove", tokens, topic).await
    }
}

impl FcmClient {
    async fn manage_topic(&self, op: &str, tokens: &[String], topic: &str) -> Result<()> {
        let url = format!("{}:{op}", self.config.iid_endpoint);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&serde_json::json!({
                "to": format!("/topics/{topic}"),
                "registration_tokens": tokens,
            }))
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| DongariError::Provider(format!("FCM topic {op} failed: {e}")))?;

        if resp.status().is_success() {
            tracing::info!("FCM topic {op}: {} device(s) on '{}'", tokens.len(), topic);
            Ok(())
        } else {
            let status = resp.status();
            Err(DongariError::Provider(format!("FCM topic {op} error {status}")))
        }
    }
}
