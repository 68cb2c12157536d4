use std::env;

/// Application configuration loaded from environment variables.
///
/// Loaded once at startup and passed by value into each component;
/// nothing reads the process environment after this.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub db_path: String,

    // Fetching
    pub rss_user_agent: String,
    pub max_feeds_per_run: usize,
    pub max_ingest_items_per_feed: usize,

    // Enrichment worker
    pub body_worker_batch: usize,
    pub body_worker_concurrency: usize,

    // Cloudflare Workers AI summarizer (all empty = summarization disabled)
    pub cf_account_id: String,
    pub cf_ai_api_token: String,
    pub cf_summary_model: String,

    // Alerting
    pub alert_cooldown_hours: i64,
    pub alert_on_breaking: bool,
    pub slack_webhook_url: Option<String>,
    pub alert_email_to: Option<String>,
    pub alert_email_from: Option<String>,
    pub postmark_api_token: Option<String>,
    pub mailgun_api_key: Option<String>,
    pub mailgun_domain: Option<String>,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            db_path: required_env("DB_PATH"),
            rss_user_agent: env::var("RSS_USER_AGENT")
                .unwrap_or_else(|_| "kywire/0.1 (+https://kywire.news)".to_string()),
            max_feeds_per_run: parse_env("MAX_FEEDS_PER_RUN", 200),
            max_ingest_items_per_feed: parse_env("MAX_INGEST_ITEMS_PER_FEED", 40),
            body_worker_batch: parse_env("BODY_WORKER_BATCH", 10),
            body_worker_concurrency: parse_env("BODY_WORKER_CONCURRENCY", 3),
            cf_account_id: env::var("CF_ACCOUNT_ID").unwrap_or_default(),
            cf_ai_api_token: env::var("CF_AI_API_TOKEN").unwrap_or_default(),
            cf_summary_model: env::var("CF_SUMMARY_MODEL")
                .unwrap_or_else(|_| "@cf/meta/llama-3.1-8b-instruct".to_string()),
            alert_cooldown_hours: parse_env("ALERT_COOLDOWN_HOURS", 6),
            alert_on_breaking: env::var("ALERT_ON_BREAKING")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            slack_webhook_url: env::var("SLACK_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
            alert_email_to: env::var("ALERT_EMAIL_TO").ok().filter(|v| !v.is_empty()),
            alert_email_from: env::var("ALERT_EMAIL_FROM").ok().filter(|v| !v.is_empty()),
            postmark_api_token: env::var("POSTMARK_API_TOKEN").ok().filter(|v| !v.is_empty()),
            mailgun_api_key: env::var("MAILGUN_API_KEY").ok().filter(|v| !v.is_empty()),
            mailgun_domain: env::var("MAILGUN_DOMAIN").ok().filter(|v| !v.is_empty()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// True when Cloudflare AI credentials are configured.
    pub fn summarizer_enabled(&self) -> bool {
        !self.cf_account_id.is_empty() && !self.cf_ai_api_token.is_empty()
    }

    /// Log the shape of each sensitive value for debugging. Secrets are
    /// reported as lengths only.
    pub fn log_redacted(&self) {
        let vars = [
            ("CF_ACCOUNT_ID", self.cf_account_id.len()),
            ("CF_AI_API_TOKEN", self.cf_ai_api_token.len()),
            (
                "POSTMARK_API_TOKEN",
                self.postmark_api_token.as_deref().map(str::len).unwrap_or(0),
            ),
            (
                "MAILGUN_API_KEY",
                self.mailgun_api_key.as_deref().map(str::len).unwrap_or(0),
            ),
            (
                "SLACK_WEBHOOK_URL",
                self.slack_webhook_url.as_deref().map(str::len).unwrap_or(0),
            ),
        ];
        for (name, len) in vars {
            if len == 0 {
                tracing::info!("{name} = (empty)");
            } else {
                tracing::info!("{name} = ({len} chars)");
            }
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parse_env<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
