//! HTTP transport for the 2whats-style WhatsApp gateway.
//!
//! The provider takes a single GET request with the credentials and message in
//! the query string and answers with JSON (or plain text on some error paths).
//! Credentials come from the `[notifier]` config section; when the section is
//! disabled or incomplete the gateway short-circuits without touching the
//! network.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{info, warn};

use storeops_core::config::NotifierConfig;

use crate::{DeliveryReport, Notifier, NotifyError};

pub struct WhatsAppGateway {
    enabled: bool,
    sender_mobile: Option<String>,
    instance_id: Option<String>,
    password: Option<SecretString>,
    base_url: String,
    client: reqwest::Client,
}

impl WhatsAppGateway {
    pub fn from_config(config: &NotifierConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| NotifyError::ClientBuild(error.to_string()))?;

        Ok(Self {
            enabled: config.enabled,
            sender_mobile: config.sender_mobile.clone(),
            instance_id: config.instance_id.clone(),
            password: config.password.clone(),
            base_url: config.base_url.clone(),
            client,
        })
    }

    fn credentials(&self) -> Option<(&str, &str, &SecretString)> {
        let sender = self.sender_mobile.as_deref().filter(|value| !value.trim().is_empty())?;
        let instance = self.instance_id.as_deref().filter(|value| !value.trim().is_empty())?;
        let password = self.password.as_ref()?;
        Some((sender, instance, password))
    }
}

#[async_trait]
impl Notifier for WhatsAppGateway {
    async fn send(&self, phone: &str, body: &str) -> Result<DeliveryReport, NotifyError> {
        if !self.enabled {
            info!(
                event_name = "notify.gateway.disabled",
                recipient = phone,
                "notifier disabled; skipping gateway call"
            );
            return Ok(DeliveryReport::Disabled);
        }

        let Some((sender_mobile, instance_id, password)) = self.credentials() else {
            warn!(
                event_name = "notify.gateway.missing_configuration",
                recipient = phone,
                "notifier enabled but sender_mobile/instance_id/password incomplete"
            );
            return Ok(DeliveryReport::MissingConfiguration);
        };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("mobile", sender_mobile),
                ("password", password.expose_secret()),
                ("instanceid", instance_id),
                ("message", body),
                ("numbers", phone),
                ("json", "1"),
                ("type", "1"),
            ])
            .send()
            .await
            .map_err(|error| NotifyError::Request(error.to_string()))?;

        let code = response.status().as_u16();
        let success = response.status().is_success();
        let provider_response = decode_provider_response(response).await;

        if success {
            info!(
                event_name = "notify.gateway.sent",
                recipient = phone,
                "gateway accepted outbound message"
            );
            Ok(DeliveryReport::Sent { provider_response })
        } else {
            warn!(
                event_name = "notify.gateway.rejected",
                recipient = phone,
                status_code = code,
                "gateway rejected outbound message"
            );
            Ok(DeliveryReport::ProviderRejected { code, provider_response })
        }
    }
}

/// Some provider error paths answer text/html; keep the raw text in that case
/// so it still lands in the logs.
async fn decode_provider_response(response: reqwest::Response) -> Value {
    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        response.json::<Value>().await.unwrap_or_else(|error| json!({ "decode_error": error.to_string() }))
    } else {
        let text = response.text().await.unwrap_or_default();
        json!({ "text": text })
    }
}

#[cfg(test)]
mod tests {
    use storeops_core::config::NotifierConfig;

    use super::*;

    fn config(enabled: bool) -> NotifierConfig {
        NotifierConfig {
            enabled,
            sender_mobile: Some("15550100".to_string()),
            instance_id: Some("instance-7".to_string()),
            password: Some("gateway-pass".to_string().into()),
            base_url: "https://www.2whats.com/api/send".to_string(),
            timeout_secs: 10,
        }
    }

    #[tokio::test]
    async fn disabled_gateway_never_touches_the_network() {
        let gateway = WhatsAppGateway::from_config(&config(false)).expect("build gateway");
        let report = gateway.send("15550300", "hello").await.expect("send");
        assert_eq!(report, DeliveryReport::Disabled);
    }

    #[tokio::test]
    async fn enabled_gateway_without_credentials_reports_missing_configuration() {
        let gateway = WhatsAppGateway::from_config(&NotifierConfig {
            sender_mobile: None,
            ..config(true)
        })
        .expect("build gateway");

        let report = gateway.send("15550300", "hello").await.expect("send");
        assert_eq!(report, DeliveryReport::MissingConfiguration);
    }

    #[tokio::test]
    async fn blank_credentials_count_as_missing() {
        let gateway = WhatsAppGateway::from_config(&NotifierConfig {
            instance_id: Some("   ".to_string()),
            ..config(true)
        })
        .expect("build gateway");

        let report = gateway.send("15550300", "hello").await.expect("send");
        assert_eq!(report, DeliveryReport::MissingConfiguration);
    }
}
