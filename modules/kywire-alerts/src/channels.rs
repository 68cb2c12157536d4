//! Delivery channels. Each channel is best-effort: failures are logged
//! and never propagate past the dispatcher.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kywire_common::Config;
use serde_json::json;

const SLACK_TIMEOUT: Duration = Duration::from_secs(8);
const EMAIL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn deliver(&self, message: &AlertMessage) -> Result<()>;
}

/// Build the channel set the environment configures. Slack, then
/// Postmark, then Mailgun; email goes out over whichever provider has
/// credentials (Postmark wins when both do).
pub fn channels_from_config(config: &Config) -> Vec<Box<dyn AlertChannel>> {
    let mut channels: Vec<Box<dyn AlertChannel>> = Vec::new();

    if let Some(url) = &config.slack_webhook_url {
        channels.push(Box::new(SlackWebhook::new(url)));
    }

    if let (Some(to), Some(from)) = (&config.alert_email_to, &config.alert_email_from) {
        if let Some(token) = &config.postmark_api_token {
            channels.push(Box::new(Postmark::new(token, from, to)));
        } else if let (Some(key), Some(domain)) = (&config.mailgun_api_key, &config.mailgun_domain) {
            channels.push(Box::new(Mailgun::new(key, domain, from, to)));
        }
    }

    channels
}

// --- Slack ---

pub struct SlackWebhook {
    webhook_url: String,
    http: reqwest::Client,
}

impl SlackWebhook {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            webhook_url: webhook_url.to_string(),
            http: reqwest::Client::builder()
                .timeout(SLACK_TIMEOUT)
                .build()
                .expect("Failed to build Slack HTTP client"),
        }
    }
}

/// Block Kit payload: a header block plus a mrkdwn section.
pub(crate) fn slack_payload(message: &AlertMessage) -> serde_json::Value {
    json!({
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": message.subject, "emoji": true }
            },
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": message.body }
            }
        ]
    })
}

#[async_trait]
impl AlertChannel for SlackWebhook {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn deliver(&self, message: &AlertMessage) -> Result<()> {
        let response = self
            .http
            .post(&self.webhook_url)
            .json(&slack_payload(message))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Slack webhook error ({status}): {body}"));
        }
        Ok(())
    }
}

// --- Postmark ---

pub struct Postmark {
    api_token: String,
    from: String,
    to: String,
    http: reqwest::Client,
}

impl Postmark {
    pub fn new(api_token: &str, from: &str, to: &str) -> Self {
        Self {
            api_token: api_token.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            http: reqwest::Client::builder()
                .timeout(EMAIL_TIMEOUT)
                .build()
                .expect("Failed to build Postmark HTTP client"),
        }
    }
}

pub(crate) fn postmark_payload(
    from: &str,
    to: &str,
    message: &AlertMessage,
) -> serde_json::Value {
    json!({
        "From": from,
        "To": to,
        "Subject": message.subject,
        "TextBody": message.body,
        "HtmlBody": format!("<pre>{}</pre>", message.body),
    })
}

#[async_trait]
impl AlertChannel for Postmark {
    fn name(&self) -> &'static str {
        "postmark"
    }

    async fn deliver(&self, message: &AlertMessage) -> Result<()> {
        let response = self
            .http
            .post("https://api.postmarkapp.com/email")
            .header("X-Postmark-Server-Token", &self.api_token)
            .json(&postmark_payload(&self.from, &self.to, message))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Postmark error ({status}): {body}"));
        }
        Ok(())
    }
}

// --- Mailgun ---

pub struct Mailgun {
    api_key: String,
    domain: String,
    from: String,
    to: String,
    http: reqwest::Client,
}

impl Mailgun {
    pub fn new(api_key: &str, domain: &str, from: &str, to: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            domain: domain.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            http: reqwest::Client::builder()
                .timeout(EMAIL_TIMEOUT)
                .build()
                .expect("Failed to build Mailgun HTTP client"),
        }
    }
}

#[async_trait]
impl AlertChannel for Mailgun {
    fn name(&self) -> &'static str {
        "mailgun"
    }

    async fn deliver(&self, message: &AlertMessage) -> Result<()> {
        let url = format!("https://api.mailgun.net/v3/{}/messages", self.domain);
        let form = [
            ("from", self.from.as_str()),
            ("to", self.to.as_str()),
            ("subject", message.subject.as_str()),
            ("text", message.body.as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Mailgun error ({status}): {body}"));
        }
        Ok(())
    }
}
