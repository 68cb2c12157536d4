//! Stage-2 enrichment: per queued item, fetch the article body, then run
//! the classification pipeline (paywall, dedup, breaking, locations,
//! bills) and the external summarizer.
//!
//! Queue transitions and the summarizer call are the only fatal steps;
//! everything else logs and moves on — the item still ends `done`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use tracing::{info, warn};

use ai_client::Summarizer;
use kywire_alerts::Alerter;
use kywire_common::QueueStatus;
use kywire_enrich::minhash::DUPLICATE_THRESHOLD;
use kywire_enrich::{
    classify_breaking, decode_signature, encode_signature, extract_bill_numbers, jaccard_estimate,
    minhash_signature, score_paywall, tag_locations, LocationInput,
};
use kywire_fetch::article::{count_words, extract_article_body};
use kywire_fetch::fetcher::ARTICLE_TIMEOUT;
use kywire_fetch::{Accept, FetchOptions, HttpFetcher};
use kywire_store::items::DedupCandidate;
use kywire_store::{Item, Store};

/// Canonical must have at least this many words to deprioritize a
/// paywalled duplicate.
const CANONICAL_MIN_WORDS: i64 = 30;

/// Bodies under this many words are rejected (Facebook exempt).
const MIN_BODY_WORDS: usize = 50;

/// Seam for fetching article HTML, so tests run without a network.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    /// Raw HTML, or `None` when the page had no usable body.
    async fn fetch_article(&self, url: &str) -> Result<Option<String>>;
}

pub struct HttpArticleFetcher {
    fetcher: HttpFetcher,
}

impl HttpArticleFetcher {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ArticleFetcher for HttpArticleFetcher {
    async fn fetch_article(&self, url: &str) -> Result<Option<String>> {
        let options = FetchOptions {
            accept: Some(Accept::Html),
            timeout: Some(ARTICLE_TIMEOUT),
            ..Default::default()
        };
        let response = self.fetcher.fetch(url, &options).await?;
        Ok(response.body.filter(|b| !b.trim().is_empty()))
    }
}

pub struct EnrichmentWorker {
    store: Store,
    article_fetcher: Arc<dyn ArticleFetcher>,
    summarizer: Arc<dyn Summarizer>,
    alerter: Option<Arc<Alerter>>,
    batch_size: usize,
    concurrency: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub processed: usize,
    pub done: usize,
    pub rejected_short: usize,
    pub failed: usize,
    pub duplicates: usize,
}

enum ItemOutcome {
    Done { duplicate: bool },
    RejectedShort,
    Failed,
}

impl EnrichmentWorker {
    pub fn new(
        store: Store,
        article_fetcher: Arc<dyn ArticleFetcher>,
        summarizer: Arc<dyn Summarizer>,
        alerter: Option<Arc<Alerter>>,
        batch_size: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            article_fetcher,
            summarizer,
            alerter,
            batch_size,
            concurrency,
        }
    }

    /// One worker pass: unstick, claim a batch, process with bounded
    /// concurrency.
    pub async fn run(&self) -> Result<WorkerSummary> {
        let now = Utc::now();
        let (reverted, stuck_failed) = self.store.recover_stuck_queue_rows(now).await?;
        if reverted > 0 || stuck_failed > 0 {
            info!(reverted, failed = stuck_failed, "Recovered stuck queue rows");
        }

        let rows = self.store.pending_queue_rows(self.batch_size).await?;
        if rows.is_empty() {
            return Ok(WorkerSummary::default());
        }
        info!(batch = rows.len(), "Enrichment batch starting");

        let outcomes: Vec<ItemOutcome> = stream::iter(rows)
            .map(|row| self.process_item(row.item_id))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut summary = WorkerSummary {
            processed: outcomes.len(),
            ..Default::default()
        };
        for outcome in &outcomes {
            match outcome {
                ItemOutcome::Done { duplicate } => {
                    summary.done += 1;
                    if *duplicate {
                        summary.duplicates += 1;
                    }
                }
                ItemOutcome::RejectedShort => summary.rejected_short += 1,
                ItemOutcome::Failed => summary.failed += 1,
            }
        }

        info!(
            processed = summary.processed,
            done = summary.done,
            rejected = summary.rejected_short,
            failed = summary.failed,
            "Enrichment batch complete"
        );
        Ok(summary)
    }

    async fn process_item(&self, item_id: String) -> ItemOutcome {
        let now = Utc::now();

        // Step 1 (fatal on error): claim the row.
        if let Err(e) = self.store.begin_queue_processing(&item_id, now).await {
            warn!(%item_id, error = %e, "Failed to claim queue row");
            return ItemOutcome::Failed;
        }

        let item = match self.store.get_item(&item_id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                let _ = self
                    .store
                    .transition_queue_row(&item_id, QueueStatus::Failed, Some("item row missing"), now)
                    .await;
                return ItemOutcome::Failed;
            }
            Err(e) => {
                let _ = self
                    .store
                    .transition_queue_row(&item_id, QueueStatus::Failed, Some(&e.to_string()), now)
                    .await;
                return ItemOutcome::Failed;
            }
        };

        // Step 2: article body (non-fatal).
        let (raw_html, body_text, word_count) = self.fetch_body(&item).await;

        // Step 3: word-count gate (Facebook exempt).
        if !item.is_facebook && word_count < MIN_BODY_WORDS {
            let _ = self
                .store
                .transition_queue_row(&item_id, QueueStatus::RejectedShort, None, now)
                .await;
            let _ = self.store.replace_item_categories(&item_id, &[]).await;
            info!(%item_id, word_count, "Item rejected as too short");
            return ItemOutcome::RejectedShort;
        }

        // Step 4: paywall scoring.
        let verdict = score_paywall(
            &item.url,
            raw_html.as_deref(),
            body_text.as_deref(),
            Some(word_count),
        );
        if let Err(e) = self
            .store
            .set_item_paywall(
                &item_id,
                verdict.paywalled,
                verdict.confidence as i64,
                &verdict.signals_json(),
            )
            .await
        {
            warn!(%item_id, error = %e, "Paywall write failed");
        }

        // Steps 5–6: signature first, then the window scan.
        let canonical = self.dedup(&item, now).await;
        let duplicate = canonical.is_some();

        // Step 6b: deprioritize a paywalled copy with a free canonical.
        if let Some(canonical_id) = &canonical {
            if verdict.paywalled {
                self.maybe_deprioritize(&item_id, canonical_id).await;
            }
        }

        // Step 7: breaking classification.
        let classification = classify_breaking(&item.title, body_text.as_deref(), now);
        if let Err(e) = self
            .store
            .set_item_breaking(
                &item_id,
                classification.is_breaking,
                classification.alert_level,
                classification.sentiment,
                classification.expires_at,
            )
            .await
        {
            warn!(%item_id, error = %e, "Breaking write failed");
        }

        // Step 8: re-tag locations on the full body.
        let default_county = self.feed_default_county(&item_id).await;
        let tags = tag_locations(&LocationInput {
            title: &item.title,
            body: body_text.as_deref(),
            region_scope: item.region_scope(),
            default_county: default_county.as_deref(),
            is_facebook: item.is_facebook,
        });
        if !tags.is_empty() {
            if let Err(e) = self.store.set_item_locations(&item_id, &tags).await {
                warn!(%item_id, error = %e, "Location write failed");
            }
        }

        // Step 9: bill linking.
        self.link_bills(&item, body_text.as_deref()).await;

        // Step 10 (fatal on error): summarization.
        let outcome = self.summarize(&item, body_text.as_deref(), now).await;
        if matches!(outcome, ItemOutcome::Failed) {
            return outcome;
        }

        // Step 11: breaking alert.
        if classification.is_breaking {
            if let Some(alerter) = &self.alerter {
                match self.store.get_item(&item_id).await {
                    Ok(Some(enriched)) => {
                        if let Err(e) = alerter.fire_breaking(&enriched, now).await {
                            warn!(%item_id, error = %e, "Breaking alert failed");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(%item_id, error = %e, "Breaking alert reload failed"),
                }
            }
        }

        ItemOutcome::Done { duplicate }
    }

    /// Fetch and extract the article body. Falls back to a previously
    /// saved body, then to feed-provided text. Returns
    /// (raw_html, body_text, effective_word_count).
    async fn fetch_body(&self, item: &Item) -> (Option<String>, Option<String>, usize) {
        let mut raw_html = None;
        if !item.is_facebook {
            match self.article_fetcher.fetch_article(&item.url).await {
                Ok(Some(html)) => {
                    let body = extract_article_body(&html, &item.url);
                    if body.word_count > 0 {
                        if let Err(e) = self
                            .store
                            .save_item_body(&item.id, Some(&html), &body.text, body.word_count as i64)
                            .await
                        {
                            warn!(item_id = %item.id, error = %e, "Body write failed");
                        }
                        return (Some(html), Some(body.text), body.word_count);
                    }
                    // Extraction came up empty; the raw page still feeds
                    // the paywall scorer.
                    raw_html = Some(html);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "Article fetch failed");
                    self.store
                        .record_fetch_error(None, &format!("article {}: {e}", item.url), Utc::now())
                        .await;
                }
            }
        }

        if let Some(saved) = &item.body_text {
            let words = item.word_count.unwrap_or_else(|| count_words(saved) as i64) as usize;
            return (raw_html, Some(saved.clone()), words);
        }

        let feed_text = match (&item.summary, &item.content) {
            (Some(s), Some(c)) => Some(format!("{s}\n{c}")),
            (Some(s), None) => Some(s.clone()),
            (None, Some(c)) => Some(c.clone()),
            (None, None) => None,
        };
        let words = feed_text.as_deref().map(count_words).unwrap_or(0);
        (raw_html, feed_text, words)
    }

    /// Store this item's signature, then scan the window. Returns the
    /// canonical id when a duplicate was found and marked.
    async fn dedup(&self, item: &Item, now: DateTime<Utc>) -> Option<String> {
        let signature = minhash_signature(&item.title, item.summary.as_deref())?;

        if let Err(e) = self
            .store
            .set_item_minhash(&item.id, &encode_signature(&signature))
            .await
        {
            warn!(item_id = %item.id, error = %e, "Signature write failed");
            return None;
        }

        let candidates = match self.store.dedup_candidates(&item.id, now).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "Dedup scan failed");
                return None;
            }
        };

        let best = best_match(&signature, &candidates)?;
        if let Err(e) = self.store.mark_item_duplicate(&item.id, &best).await {
            warn!(item_id = %item.id, error = %e, "Duplicate write failed");
            return None;
        }
        info!(item_id = %item.id, canonical = %best, "Duplicate detected");
        Some(best)
    }

    async fn maybe_deprioritize(&self, item_id: &str, canonical_id: &str) {
        match self.store.get_item(canonical_id).await {
            Ok(Some(canonical)) => {
                let free = !canonical.is_paywalled;
                let long_enough = canonical.word_count.unwrap_or(0) >= CANONICAL_MIN_WORDS;
                if free && long_enough {
                    if let Err(e) = self.store.set_item_paywall_deprioritized(item_id).await {
                        warn!(%item_id, error = %e, "Deprioritize write failed");
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!(%item_id, error = %e, "Canonical lookup failed"),
        }
    }

    async fn feed_default_county(&self, item_id: &str) -> Option<String> {
        // The item keeps its existing tags if this lookup fails; the
        // default county is already among them from stage 1.
        let feed_id = self.store.first_feed_for_item(item_id).await.ok().flatten()?;
        self.store
            .get_feed(&feed_id)
            .await
            .ok()
            .flatten()
            .and_then(|f| f.default_county)
    }

    async fn link_bills(&self, item: &Item, body_text: Option<&str>) {
        let mut text = item.title.clone();
        if let Some(body) = body_text {
            text.push('\n');
            text.push_str(body);
        }

        for bill in extract_bill_numbers(&text) {
            match self.store.bill_exists(&bill).await {
                Ok(true) => {
                    if let Err(e) = self.store.link_article_bill(&item.id, &bill).await {
                        warn!(item_id = %item.id, bill, error = %e, "Bill link failed");
                        continue;
                    }
                    if let Err(e) = self.store.add_item_category(&item.id, "legislature").await {
                        warn!(item_id = %item.id, error = %e, "Legislature category failed");
                    }
                }
                Ok(false) => {}
                Err(e) => warn!(item_id = %item.id, bill, error = %e, "Bill lookup failed"),
            }
        }
    }

    /// Step 10: summarize and close the queue row. AI failure is the one
    /// enrichment failure that marks the row failed; everything before
    /// it already landed.
    async fn summarize(&self, item: &Item, body_text: Option<&str>, now: DateTime<Utc>) -> ItemOutcome {
        let input = body_text
            .filter(|b| !b.is_empty())
            .or(item.summary.as_deref());

        let (status, error): (QueueStatus, Option<String>) = match input {
            Some(body) if self.summarizer.is_configured() => {
                let _ = self
                    .store
                    .transition_queue_row(&item.id, QueueStatus::Summarizing, None, now)
                    .await;
                match self.summarizer.summarize(&item.title, body).await {
                    Ok(summary) => {
                        if let Err(e) = self
                            .store
                            .set_item_ai_summary(&item.id, &summary.summary, &summary.meta_description)
                            .await
                        {
                            warn!(item_id = %item.id, error = %e, "AI summary write failed");
                        }
                        (QueueStatus::Done, None)
                    }
                    Err(e) => (QueueStatus::Failed, Some(e.to_string())),
                }
            }
            // No credentials or nothing to summarize: the RSS summary stands.
            _ => (QueueStatus::Done, None),
        };

        if let Err(e) = self
            .store
            .transition_queue_row(&item.id, status, error.as_deref(), now)
            .await
        {
            warn!(item_id = %item.id, error = %e, "Queue transition failed");
            return ItemOutcome::Failed;
        }

        match status {
            QueueStatus::Failed => ItemOutcome::Failed,
            _ => ItemOutcome::Done { duplicate: false },
        }
    }
}

/// Best window match at or above the duplicate threshold. Ties on the
/// estimate break toward the most recent `published_at`.
fn best_match(
    signature: &[u32; kywire_enrich::minhash::SIGNATURE_LEN],
    candidates: &[DedupCandidate],
) -> Option<String> {
    let mut best: Option<(f64, &DedupCandidate)> = None;
    for candidate in candidates {
        let Some(candidate_sig) = decode_signature(&candidate.minhash) else {
            continue;
        };
        let estimate = jaccard_estimate(signature, &candidate_sig);
        if estimate < DUPLICATE_THRESHOLD {
            continue;
        }
        best = match best {
            None => Some((estimate, candidate)),
            Some((top, _)) if estimate > top => Some((estimate, candidate)),
            Some((top, current))
                if estimate == top && candidate.published_at > current.published_at =>
            {
                Some((estimate, candidate))
            }
            other => other,
        };
    }
    best.map(|(_, candidate)| candidate.id.clone())
}
