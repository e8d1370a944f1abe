//! Dispatch — resolve a recipient set to the right provider call and
//! normalize the response into one per-recipient delivery report.
//!
//! The three-way split (topic / single token / multicast) exists because
//! the provider's single-target and multi-target calls have different
//! response shapes. A provider failure for one recipient never fails the
//! whole batch; a total outage comes back as an all-failed report.

use std::sync::Arc;

use crate::fcm::PushGateway;
use crate::notice::RecipientSet;

/// Who actually got the push, by receipt address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

impl DeliveryReport {
    pub fn all_delivered(addresses: &[String]) -> Self {
        Self {
            delivered: addresses.to_vec(),
            failed: Vec::new(),
        }
    }

    pub fn all_failed(addresses: &[String]) -> Self {
        Self {
            delivered: Vec::new(),
            failed: addresses.to_vec(),
        }
    }
}

/// Sends rendered notices through the push gateway.
#[derive(Clone)]
pub struct Dispatcher {
    gateway: Arc<dyn PushGateway>,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self { gateway }
    }

    /// Send `title`/`body` to `recipients`. Never errors: dispatch-time
    /// failures are logged here and reflected in the report, because the
    /// fire path has no synchronous caller to report to.
    pub async fn send(&self, title: &str, body: &str, recipients: &RecipientSet) -> DeliveryReport {
        match recipients {
            RecipientSet::Topic { name, members } => {
                match self.gateway.send_to_topic(name, title, body).await {
                    Ok(()) => {
                        tracing::info!("📣 Topic '{}' notified ({} member(s))", name, members.len());
                        DeliveryReport::all_delivered(members)
                    }
                    Err(e) => {
                        tracing::warn!("⚠️ Topic send to '{}' failed: {e}", name);
                        DeliveryReport::all_failed(members)
                    }
                }
            }
            RecipientSet::Tokens(tokens) if tokens.len() == 1 => {
                match self.gateway.send_to_token(&tokens[0], title, body).await {
                    Ok(()) => DeliveryReport::all_delivered(tokens),
                    Err(e) => {
                        tracing::warn!("⚠️ Single-token send failed: {e}");
                        DeliveryReport::all_failed(tokens)
                    }
                }
            }
            RecipientSet::Tokens(tokens) => {
                match self.gateway.send_to_tokens(tokens, title, body).await {
                    Ok(outcomes) => {
                        let mut report = DeliveryReport::default();
                        for outcome in outcomes {
                            if outcome.ok {
                                report.delivered.push(outcome.token);
                            } else {
                                tracing::warn!(
                                    "⚠️ Token send failed: {}",
                                    outcome.error.as_deref().unwrap_or("unknown")
                                );
                                report.failed.push(outcome.token);
                            }
                        }
                        report
                    }
                    Err(e) => {
                        tracing::warn!("⚠️ Multicast of {} token(s) failed: {e}", tokens.len());
                        DeliveryReport::all_failed(tokens)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Recording gateway used by dispatcher, registry, and reconciler
    //! tests.

    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use dongari_core::error::{DongariError, Result};

    use crate::fcm::{PushGateway, SendOutcome};

    /// One recorded provider call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum SentCall {
        Topic { topic: String, title: String, body: String },
        Token { token: String, title: String, body: String },
        Multicast { tokens: Vec<String>, title: String, body: String },
    }

    #[derive(Default)]
    pub struct MockGateway {
        pub calls: Mutex<Vec<SentCall>>,
        /// Tokens the provider rejects per-recipient.
        pub reject_tokens: Mutex<HashSet<String>>,
        /// Simulate a total outage.
        pub outage: Mutex<bool>,
    }

    impl MockGateway {
        pub fn reject(&self, token: &str) {
            self.reject_tokens.lock().unwrap().insert(token.to_string());
        }

        pub fn set_outage(&self, down: bool) {
            *self.outage.lock().unwrap() = down;
        }

        pub fn calls(&self) -> Vec<SentCall> {
            self.calls.lock().unwrap().clone()
        }

        fn check_outage(&self) -> Result<()> {
            if *self.outage.lock().unwrap() {
                Err(DongariError::Provider("simulated outage".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl PushGateway for MockGateway {
        async fn send_to_topic(&self, topic: &str, title: &str, body: &str) -> Result<()> {
            self.check_outage()?;
            self.calls.lock().unwrap().push(SentCall::Topic {
                topic: topic.to_string(),
                title: title.to_string(),
                body: body.to_string(),
            });
            Ok(())
        }

        async fn send_to_token(&self, token: &str, title: &str, body: &str) -> Result<()> {
            self.check_outage()?;
            if self.reject_tokens.lock().unwrap().contains(token) {
                return Err(DongariError::Provider("rejected token".into()));
            }
            self.calls.lock().unwrap().push(SentCall::Token {
                token: token.to_string(),
                title: title.to_string(),
                body: body.to_string(),
            });
            Ok(())
        }

        async fn send_to_tokens(
            &self,
            tokens: &[String],
            title: &str,
            body: &str,
        ) -> Result<Vec<SendOutcome>> {
            self.check_outage()?;
            self.calls.lock().unwrap().push(SentCall::Multicast {
                tokens: tokens.to_vec(),
                title: title.to_string(),
                body: body.to_string(),
            });
            let rejected = self.reject_tokens.lock().unwrap();
            Ok(tokens
                .iter()
                .map(|t| {
                    let ok = !rejected.contains(t);
                    SendOutcome {
                        token: t.clone(),
                        ok,
                        error: (!ok).then(|| "NotRegistered".to_string()),
                    }
                })
                .collect())
        }

        async fn subscribe(&self, _tokens: &[String], _topic: &str) -> Result<()> {
            self.check_outage()
        }

        async fn unsubscribe(&self, _tokens: &[String], _topic: &str) -> Result<()> {
            self.check_outage()
        }
    }
}
