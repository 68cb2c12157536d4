use sqlx::Row;
use tracing::info;

use crate::Store;

/// Run idempotent schema migrations: tables, enrichment columns, indexes.
pub async fn migrate(store: &Store) -> Result<(), sqlx::Error> {
    let pool = &store.pool;

    info!("Running schema migrations...");

    let tables = [
        r#"
        CREATE TABLE IF NOT EXISTS feeds (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT 'news',
            state_code TEXT NOT NULL DEFAULT 'KY',
            region_scope TEXT NOT NULL DEFAULT 'ky',
            fetch_mode TEXT NOT NULL DEFAULT 'rss',
            scraper_id TEXT,
            default_county TEXT,
            enabled INTEGER NOT NULL DEFAULT 1,
            is_bing_fallback INTEGER NOT NULL DEFAULT 0,
            etag TEXT,
            last_modified TEXT,
            last_checked_at TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            guid TEXT,
            author TEXT,
            region_scope TEXT NOT NULL DEFAULT 'ky',
            published_at TEXT,
            fetched_at TEXT NOT NULL,
            summary TEXT,
            content TEXT,
            image_url TEXT,
            body_text TEXT,
            word_count INTEGER,
            hash TEXT NOT NULL,
            is_facebook INTEGER NOT NULL DEFAULT 0,
            tags TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS feed_items (
            feed_id TEXT NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
            item_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            PRIMARY KEY (feed_id, item_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS item_locations (
            item_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            state_code TEXT NOT NULL,
            county TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (item_id, state_code, county)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS item_categories (
            item_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            category TEXT NOT NULL,
            PRIMARY KEY (item_id, category)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS ingestion_queue (
            item_id TEXT PRIMARY KEY REFERENCES items(id) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'pending',
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS ky_bills (
            bill_number TEXT PRIMARY KEY,
            title TEXT,
            session_year INTEGER,
            url TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS article_bills (
            item_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            bill_number TEXT NOT NULL REFERENCES ky_bills(bill_number) ON DELETE CASCADE,
            PRIMARY KEY (item_id, bill_number)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS school_events (
            uid TEXT PRIMARY KEY,
            county TEXT NOT NULL,
            title TEXT NOT NULL,
            start_at TEXT NOT NULL,
            end_at TEXT,
            location TEXT,
            url TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS alert_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            alert_key TEXT NOT NULL,
            fired_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS fetch_errors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            feed_id TEXT,
            at TEXT NOT NULL,
            error TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS fetch_runs (
            id TEXT PRIMARY KEY,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            status TEXT NOT NULL,
            source TEXT NOT NULL,
            details_json TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS feed_run_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT NOT NULL REFERENCES fetch_runs(id) ON DELETE CASCADE,
            feed_id TEXT NOT NULL,
            status TEXT NOT NULL,
            http_status INTEGER,
            duration_ms INTEGER NOT NULL,
            items_seen INTEGER NOT NULL DEFAULT 0,
            items_upserted INTEGER NOT NULL DEFAULT 0,
            error_message TEXT
        )
        "#,
    ];

    for ddl in &tables {
        sqlx::query(ddl).execute(pool).await?;
    }
    info!("Base tables ensured");

    // Enrichment columns are added idempotently with defaults equivalent
    // to "feature off", so a pre-enrichment database keeps working.
    let enrichment_columns = [
        ("minhash", "TEXT"),
        ("is_duplicate", "INTEGER NOT NULL DEFAULT 0"),
        ("canonical_item_id", "TEXT"),
        ("is_paywalled", "INTEGER NOT NULL DEFAULT 0"),
        ("paywall_confidence", "INTEGER NOT NULL DEFAULT 0"),
        ("paywall_signals", "TEXT"),
        ("paywall_deprioritized", "INTEGER NOT NULL DEFAULT 0"),
        ("is_breaking", "INTEGER NOT NULL DEFAULT 0"),
        ("alert_level", "TEXT"),
        ("sentiment", "TEXT"),
        ("breaking_expires_at", "TEXT"),
        ("ai_summary", "TEXT"),
        ("ai_meta_description", "TEXT"),
        ("categories_json", "TEXT"),
    ];
    for (name, decl) in &enrichment_columns {
        add_column_if_missing(store, "items", name, decl).await?;
    }
    info!("Enrichment columns ensured");

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_items_fetched_at ON items(fetched_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_items_published_at ON items(published_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_items_breaking ON items(is_breaking, breaking_expires_at)",
        "CREATE INDEX IF NOT EXISTS idx_items_paywall ON items(is_paywalled, paywall_deprioritized)",
        "CREATE INDEX IF NOT EXISTS idx_items_duplicate ON items(is_duplicate)",
        "CREATE INDEX IF NOT EXISTS idx_item_locations_county ON item_locations(state_code, county)",
        "CREATE INDEX IF NOT EXISTS idx_item_categories_category ON item_categories(category)",
        "CREATE INDEX IF NOT EXISTS idx_queue_status ON ingestion_queue(status, updated_at)",
        "CREATE INDEX IF NOT EXISTS idx_alert_log_key ON alert_log(alert_key, fired_at)",
        "CREATE INDEX IF NOT EXISTS idx_fetch_errors_feed ON fetch_errors(feed_id, at)",
        "CREATE INDEX IF NOT EXISTS idx_feeds_enabled ON feeds(enabled, last_checked_at)",
    ];
    for idx in &indexes {
        sqlx::query(idx).execute(pool).await?;
    }
    info!("Indexes ensured");

    Ok(())
}

/// `ALTER TABLE ... ADD COLUMN` guarded by a `PRAGMA table_info` probe;
/// SQLite has no `ADD COLUMN IF NOT EXISTS`.
async fn add_column_if_missing(
    store: &Store,
    table: &str,
    column: &str,
    decl: &str,
) -> Result<(), sqlx::Error> {
    let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
        .fetch_all(&store.pool)
        .await?;
    let exists = rows.iter().any(|row| {
        row.try_get::<String, _>("name")
            .map(|n| n == column)
            .unwrap_or(false)
    });
    if !exists {
        sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))
            .execute(&store.pool)
            .await?;
    }
    Ok(())
}
