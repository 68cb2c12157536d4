//! The two-stage pipeline: stage-1 feed ingestion, stage-2 body/AI
//! enrichment, plus the scheduler that drives both and the periodic
//! maintenance tasks (bing fallback, school calendars, legislature sync,
//! rss discovery, alerting).

pub mod bing;
pub mod discovery;
pub mod legislature;
pub mod orchestrator;
pub mod relevance;
pub mod scheduler;
pub mod school;
pub mod seeds;
pub mod worker;

pub use orchestrator::{Orchestrator, RunSummary};
pub use scheduler::{Cadence, FirstRun, Scheduler, TaskSpec};
pub use worker::{ArticleFetcher, EnrichmentWorker, HttpArticleFetcher, WorkerSummary};
