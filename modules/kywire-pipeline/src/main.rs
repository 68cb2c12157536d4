use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Utc, Weekday};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::{CloudflareAi, NoopSummarizer, Summarizer};
use kywire_alerts::{channels_from_config, Alerter};
use kywire_common::Config;
use kywire_fetch::HttpFetcher;
use kywire_pipeline::{
    bing, discovery, legislature, school, seeds, Cadence, EnrichmentWorker, FirstRun,
    HttpArticleFetcher, Orchestrator, Scheduler, TaskSpec,
};
use kywire_store::{migrate, Store};

#[derive(Parser)]
#[command(name = "kywire", about = "Kentucky news aggregation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler daemon (all periodic tasks).
    Run,
    /// Apply schema migrations and exit.
    Migrate,
    /// One stage-1 ingestion pass.
    Ingest,
    /// One stage-2 enrichment pass.
    Enrich,
    /// Seed Bing fallback feeds for uncovered counties.
    SeedBing,
    /// Sync school district calendars.
    SyncSchools,
    /// Sync the legislature bill registry.
    SyncBills,
    /// Probe scrape feeds for advertised RSS.
    Discover,
    /// Run the coverage-gap and feed-failure checks.
    Alerts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    info!("kywire starting");
    config.log_redacted();

    let store = Store::open(&config.db_path).await?;
    migrate::migrate(&store).await?;

    let fetcher = HttpFetcher::new(&config.rss_user_agent);

    match cli.command {
        Command::Migrate => {
            info!("Migrations applied");
        }
        Command::Ingest => {
            seeds::seed_feeds(&store).await?;
            let orchestrator = build_orchestrator(&store, &fetcher, &config);
            let summary = orchestrator.run().await?;
            info!(?summary, "Ingestion pass finished");
        }
        Command::Enrich => {
            let worker = build_worker(&store, &fetcher, &config);
            let summary = worker.run().await?;
            info!(?summary, "Enrichment pass finished");
        }
        Command::SeedBing => {
            let seeded = bing::seed_bing_fallback(&store).await?;
            info!(seeded, "Bing fallback seeded");
        }
        Command::SyncSchools => {
            let summary = school::sync_school_calendars(&store, &fetcher).await?;
            info!(?summary, "School sync finished");
        }
        Command::SyncBills => {
            let upserted = legislature::sync_bills(&store, &fetcher).await?;
            info!(upserted, "Bill sync finished");
        }
        Command::Discover => {
            let promoted = discovery::discover_rss_feeds(&store, &fetcher).await?;
            info!(promoted, "Discovery finished");
        }
        Command::Alerts => {
            let alerter = build_alerter(&store, &config);
            let now = Utc::now();
            alerter.check_coverage_gaps(now).await?;
            alerter.check_feed_failures(now).await?;
        }
        Command::Run => {
            seeds::seed_feeds(&store).await?;
            run_scheduler(store, fetcher, config).await;
        }
    }

    Ok(())
}

fn build_orchestrator(store: &Store, fetcher: &HttpFetcher, config: &Config) -> Orchestrator {
    Orchestrator::new(
        store.clone(),
        fetcher.clone(),
        config.max_feeds_per_run,
        config.max_ingest_items_per_feed,
    )
}

fn build_summarizer(config: &Config) -> Arc<dyn Summarizer> {
    if config.summarizer_enabled() {
        Arc::new(CloudflareAi::new(
            &config.cf_account_id,
            &config.cf_ai_api_token,
            &config.cf_summary_model,
        ))
    } else {
        Arc::new(NoopSummarizer)
    }
}

fn build_alerter(store: &Store, config: &Config) -> Alerter {
    Alerter::new(
        store.clone(),
        channels_from_config(config),
        config.alert_cooldown_hours,
    )
}

fn build_worker(store: &Store, fetcher: &HttpFetcher, config: &Config) -> EnrichmentWorker {
    let alerter = config
        .alert_on_breaking
        .then(|| Arc::new(build_alerter(store, config)));
    EnrichmentWorker::new(
        store.clone(),
        Arc::new(HttpArticleFetcher::new(fetcher.clone())),
        build_summarizer(config),
        alerter,
        config.body_worker_batch,
        config.body_worker_concurrency,
    )
}

async fn run_scheduler(store: Store, fetcher: HttpFetcher, config: Config) {
    let orchestrator = Arc::new(build_orchestrator(&store, &fetcher, &config));
    let worker = Arc::new(build_worker(&store, &fetcher, &config));
    let alerter = Arc::new(build_alerter(&store, &config));

    let mut scheduler = Scheduler::new(store.clone());

    {
        let orchestrator = orchestrator.clone();
        scheduler.add_task(
            TaskSpec {
                name: "feed-ingestion",
                cadence: Cadence::Every(Duration::from_secs(15 * 60)),
                first_run: FirstRun::Immediate,
            },
            move || {
                let orchestrator = orchestrator.clone();
                async move { orchestrator.run().await.map(|_| ()) }
            },
        );
    }

    {
        let worker = worker.clone();
        scheduler.add_task(
            TaskSpec {
                name: "enrichment",
                cadence: Cadence::Every(Duration::from_secs(5 * 60)),
                first_run: FirstRun::Immediate,
            },
            move || {
                let worker = worker.clone();
                async move { worker.run().await.map(|_| ()) }
            },
        );
    }

    {
        let store = store.clone();
        let fetcher = fetcher.clone();
        scheduler.add_task(
            TaskSpec {
                name: "school-calendar",
                cadence: Cadence::Every(Duration::from_secs(6 * 60 * 60)),
                first_run: FirstRun::Deferred,
            },
            move || {
                let store = store.clone();
                let fetcher = fetcher.clone();
                async move {
                    school::sync_school_calendars(&store, &fetcher)
                        .await
                        .map(|_| ())
                }
            },
        );
    }

    {
        let store = store.clone();
        let fetcher = fetcher.clone();
        scheduler.add_task(
            TaskSpec {
                name: "legislature",
                cadence: Cadence::DailyAt { hour: 8, minute: 0 },
                first_run: FirstRun::Deferred,
            },
            move || {
                let store = store.clone();
                let fetcher = fetcher.clone();
                async move { legislature::sync_bills(&store, &fetcher).await.map(|_| ()) }
            },
        );
    }

    {
        let alerter = alerter.clone();
        scheduler.add_task(
            TaskSpec {
                name: "coverage-alerts",
                cadence: Cadence::DailyAt { hour: 4, minute: 0 },
                first_run: FirstRun::Deferred,
            },
            move || {
                let alerter = alerter.clone();
                async move {
                    let now = Utc::now();
                    alerter.check_coverage_gaps(now).await?;
                    alerter.check_feed_failures(now).await?;
                    Ok(())
                }
            },
        );
    }

    {
        let store = store.clone();
        let fetcher = fetcher.clone();
        scheduler.add_task(
            TaskSpec {
                name: "rss-discovery",
                cadence: Cadence::WeeklyAt {
                    weekday: Weekday::Sun,
                    hour: 3,
                    minute: 0,
                },
                first_run: FirstRun::Deferred,
            },
            move || {
                let store = store.clone();
                let fetcher = fetcher.clone();
                async move { discovery::discover_rss_feeds(&store, &fetcher).await.map(|_| ()) }
            },
        );
    }

    {
        let store = store.clone();
        scheduler.add_task(
            TaskSpec {
                name: "bing-fallback",
                cadence: Cadence::DailyAt { hour: 6, minute: 0 },
                first_run: FirstRun::Deferred,
            },
            move || {
                let store = store.clone();
                async move { bing::seed_bing_fallback(&store).await.map(|_| ()) }
            },
        );
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    scheduler.run(shutdown_rx).await;
}
