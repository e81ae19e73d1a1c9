//! Outbound reviewer notifications.
//!
//! Approval workflows nudge reviewers over a WhatsApp HTTP gateway. Delivery
//! is strictly best-effort: the orchestrator logs failures and moves on, so
//! nothing in this crate is allowed to make an approval request's durability
//! depend on the message provider.
//!
//! # Key Types
//!
//! - [`Notifier`] - the send seam the orchestrator holds
//! - [`gateway::WhatsAppGateway`] - HTTP transport built from `NotifierConfig`
//! - [`NoopNotifier`] / [`RecordingNotifier`] - doubles for wiring and tests
//! - [`messages`] - the reviewer-facing message templates

pub mod gateway;
pub mod messages;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;

pub use gateway::WhatsAppGateway;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("gateway request failed: {0}")]
    Request(String),
    #[error("gateway client could not be constructed: {0}")]
    ClientBuild(String),
}

/// What the gateway reported for one send attempt. Short-circuit outcomes
/// (disabled, incomplete credentials) are reports, not errors, matching how
/// operators read the provider logs.
#[derive(Clone, Debug, PartialEq)]
pub enum DeliveryReport {
    Sent { provider_response: Value },
    Disabled,
    MissingConfiguration,
    ProviderRejected { code: u16, provider_response: Value },
}

impl DeliveryReport {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, phone: &str, body: &str) -> Result<DeliveryReport, NotifyError>;
}

/// Notifier used when the gateway is not configured.
#[derive(Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _phone: &str, _body: &str) -> Result<DeliveryReport, NotifyError> {
        Ok(DeliveryReport::Disabled)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub phone: String,
    pub body: String,
}

/// Capturing double for service and handler tests.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingNotifier {
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, phone: &str, body: &str) -> Result<DeliveryReport, NotifyError> {
        let mut sent = self.sent.lock().await;
        sent.push(SentMessage { phone: phone.to_string(), body: body.to_string() });
        Ok(DeliveryReport::Sent { provider_response: Value::Null })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_notifier_reports_disabled() {
        let report = NoopNotifier.send("15550100", "hello").await.expect("noop send");
        assert_eq!(report, DeliveryReport::Disabled);
        assert!(!report.is_sent());
    }

    #[tokio::test]
    async fn recording_notifier_captures_messages_in_order() {
        let notifier = RecordingNotifier::default();
        notifier.send("15550100", "first").await.expect("send");
        notifier.send("15550101", "second").await.expect("send");

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].phone, "15550100");
        assert_eq!(sent[1].body, "second");
    }
}
