// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! SQLite persistence sink.
//!
//! One crawl's rows are appended in whole batches, each batch in its own
//! transaction, so concurrent crawls never interleave partial batches for
//! different crawl ids inside one logical write. The schema is applied at
//! startup and is idempotent.

use crate::models::crawl::{CrawlStatus, CrawlSummary, LatestCrawl};
use crate::models::records::{
    BrokenLinkRecord, Dataset, DatasetRow, DuplicateRecord, ImageRecord, RedirectRecord,
    StructuredDataRecord, UrlRecord, EXPORT_DELIMITER,
};
use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

const SCHEMA: &str = include_str!("../../db/schema.sql");

/// Handle to the crawl datastore.
#[derive(Clone)]
pub struct StorageClient {
    pool: SqlitePool,
}

impl StorageClient {
    /// Open the database and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .with_context(|| format!("failed to open database at {database_url}"))?;
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .context("failed to apply database schema")?;
        Ok(Self { pool })
    }

    /// Upsert the crawl row keyed by crawl id.
    pub async fn write_summary(
        &self,
        crawl_id: &str,
        domain: &str,
        status: CrawlStatus,
        total_urls: i64,
        summary: &CrawlSummary,
    ) -> Result<()> {
        let summary_json = serde_json::to_string(summary)?;
        sqlx::query(
            "REPLACE INTO crawls (crawl_id, domain, started_at, finished_at, status, total_urls, summary_json)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(crawl_id)
        .bind(domain)
        .bind(&summary.started_at)
        .bind(&summary.finished_at)
        .bind(status.as_str())
        .bind(total_urls)
        .bind(summary_json)
        .execute(&self.pool)
        .await
        .context("failed to write crawl summary")?;
        Ok(())
    }

    /// Append a homogeneous batch of records in one transaction.
    /// A no-op on an empty batch.
    pub async fn insert_many<R: DatasetRow>(&self, dataset: Dataset, rows: &[R]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        debug_assert_eq!(dataset.columns(), R::COLUMNS);

        let placeholders = vec!["?"; R::COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            dataset.table(),
            R::COLUMNS.join(", "),
            placeholders
        );

        let mut tx = self.pool.begin().await?;
        for row in rows {
            row.bind_values(sqlx::query(&sql))
                .execute(&mut *tx)
                .await
                .with_context(|| format!("failed to insert into {}", dataset.table()))?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// All export lines for one crawl's dataset: the column-name header first,
    /// then one delimited line per record.
    pub async fn export_rows(&self, crawl_id: &str, dataset: Dataset) -> Result<Vec<String>> {
        let mut lines = vec![dataset.columns().join(EXPORT_DELIMITER)];
        let sql = format!(
            "SELECT {} FROM {} WHERE crawl_id = ?",
            dataset.columns().join(", "),
            dataset.table()
        );
        match dataset {
            Dataset::Urls => self.push_rows::<UrlRecord>(&sql, crawl_id, &mut lines).await?,
            Dataset::Redirects => {
                self.push_rows::<RedirectRecord>(&sql, crawl_id, &mut lines)
                    .await?
            }
            Dataset::BrokenLinks => {
                self.push_rows::<BrokenLinkRecord>(&sql, crawl_id, &mut lines)
                    .await?
            }
            Dataset::DuplicatesTitles | Dataset::DuplicatesMeta => {
                self.push_rows::<DuplicateRecord>(&sql, crawl_id, &mut lines)
                    .await?
            }
            Dataset::Images => {
                self.push_rows::<ImageRecord>(&sql, crawl_id, &mut lines)
                    .await?
            }
            Dataset::StructuredData => {
                self.push_rows::<StructuredDataRecord>(&sql, crawl_id, &mut lines)
                    .await?
            }
        }
        Ok(lines)
    }

    async fn push_rows<R>(&self, sql: &str, crawl_id: &str, lines: &mut Vec<String>) -> Result<()>
    where
        R: DatasetRow + for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let rows: Vec<R> = sqlx::query_as(sql)
            .bind(crawl_id)
            .fetch_all(&self.pool)
            .await?;
        lines.extend(
            rows.iter()
                .map(|row| row.export_fields().join(EXPORT_DELIMITER)),
        );
        Ok(())
    }

    /// Most recent finished crawl for a domain, with its summary metrics.
    pub async fn latest_crawl(&self, domain: &str) -> Result<Option<LatestCrawl>> {
        let row: Option<(String, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as(
                "SELECT crawl_id, started_at, finished_at, summary_json
                 FROM crawls
                 WHERE domain = ? AND status = 'finished'
                 ORDER BY started_at DESC
                 LIMIT 1",
            )
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(crawl_id, started_at, finished_at, summary_json)| {
            let metrics = summary_json
                .as_deref()
                .and_then(|json| serde_json::from_str::<CrawlSummary>(json).ok())
                .map(|summary| summary.metrics)
                .unwrap_or_default();
            LatestCrawl {
                crawl_id,
                started_at,
                finished_at,
                summary_metrics: metrics,
            }
        }))
    }
}
