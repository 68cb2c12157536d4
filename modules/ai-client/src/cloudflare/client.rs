use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::debug;

use super::prompt_builder::{meta_description_prompt, summary_prompt};
use super::types::{RunRequest, RunResponse};
use crate::traits::{ArticleSummary, Summarizer};

const CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 512;

/// Cloudflare Workers AI text-generation client.
pub struct CloudflareAi {
    account_id: String,
    api_token: String,
    model: String,
    http: reqwest::Client,
    base_url: String,
}

impl CloudflareAi {
    pub fn new(account_id: &str, api_token: &str, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build Cloudflare AI HTTP client");
        Self {
            account_id: account_id.to_string(),
            api_token: api_token.to_string(),
            model: model.to_string(),
            http,
            base_url: CLOUDFLARE_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    async fn run(&self, prompt: String) -> Result<String> {
        let url = format!(
            "{base}/accounts/{account}/ai/run/{model}",
            base = self.base_url,
            account = self.account_id,
            model = self.model,
        );

        debug!(model = %self.model, "Workers AI run request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&RunRequest {
                prompt,
                max_tokens: MAX_TOKENS,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Workers AI error ({status}): {error_text}"));
        }

        let parsed: RunResponse = response.json().await?;
        if !parsed.success {
            let detail = parsed
                .errors
                .first()
                .map(|e| format!("{:?} {}", e.code, e.message))
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(anyhow!("Workers AI reported failure: {detail}"));
        }

        parsed
            .result
            .and_then(|r| r.response)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Workers AI returned an empty response"))
    }
}

#[async_trait]
impl Summarizer for CloudflareAi {
    async fn summarize(&self, title: &str, body: &str) -> Result<ArticleSummary> {
        let summary = self.run(summary_prompt(title, body)).await?;
        let meta_description = self.run(meta_description_prompt(title, body)).await?;
        Ok(ArticleSummary {
            summary,
            meta_description,
        })
    }

    fn is_configured(&self) -> bool {
        !self.account_id.is_empty() && !self.api_token.is_empty()
    }
}
