use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::models::{FoodLogEntry, NutritionReport};

/// Append-only food log. The analysis pipeline only ever hands a chosen
/// report plus a date over this boundary; it never reads history back for
/// analysis.
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let db = Database { pool };
        db.init_tables().await?;
        Ok(db)
    }

    async fn init_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS food_logs (
                id BIGSERIAL PRIMARY KEY,
                log_date DATE NOT NULL,
                report JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_food_logs_date ON food_logs(log_date)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Save a user-selected report under the given day; returns the new id.
    pub async fn save_report(&self, log_date: NaiveDate, report: &NutritionReport) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO food_logs (log_date, report, created_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(log_date)
        .bind(serde_json::to_value(report)?)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.get("id");
        log::info!("💾 Saved food log {} for {}", id, log_date);
        Ok(id)
    }

    pub async fn reports_for_date(&self, log_date: NaiveDate) -> Result<Vec<FoodLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, log_date, report, created_at
            FROM food_logs
            WHERE log_date = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(log_date)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let report_json: serde_json::Value = row.get("report");
            entries.push(FoodLogEntry {
                id: Some(row.get("id")),
                log_date: row.get("log_date"),
                // Stored reports predate schema tweaks; normalize on the way
                // out so callers always see the canonical shape.
                report: crate::services::normalize::normalize_report(&report_json),
                created_at: row.get("created_at"),
            });
        }
        Ok(entries)
    }

    /// Returns true when a row was actually deleted.
    pub async fn delete_report(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM food_logs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
