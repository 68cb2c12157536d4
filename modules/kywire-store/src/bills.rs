use chrono::{DateTime, Utc};

use crate::Store;

/// A registry row for one KY legislature bill.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KyBill {
    pub bill_number: String,
    pub title: Option<String>,
    pub session_year: Option<i64>,
    pub url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub async fn upsert_bill(
        &self,
        bill_number: &str,
        title: Option<&str>,
        session_year: Option<i64>,
        url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO ky_bills (bill_number, title, session_year, url, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(bill_number) DO UPDATE SET
                title = COALESCE(excluded.title, ky_bills.title),
                session_year = COALESCE(excluded.session_year, ky_bills.session_year),
                url = COALESCE(excluded.url, ky_bills.url),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(bill_number)
        .bind(title)
        .bind(session_year)
        .bind(url)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn bill_exists(&self, bill_number: &str) -> Result<bool, sqlx::Error> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT bill_number FROM ky_bills WHERE bill_number = ?1")
                .bind(bill_number)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Link an article to a registered bill. The FK makes an unregistered
    /// bill an error, so callers gate on `bill_exists` first.
    pub async fn link_article_bill(
        &self,
        item_id: &str,
        bill_number: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO article_bills (item_id, bill_number) VALUES (?1, ?2)")
            .bind(item_id)
            .bind(bill_number)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn article_bills(&self, item_id: &str) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT bill_number FROM article_bills WHERE item_id = ?1 ORDER BY bill_number",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
    }
}
