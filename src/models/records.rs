// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Per-dataset output row types.
//!
//! Every row a crawl produces is one of a closed set of record types, each
//! tagged with the owning `crawl_id` and immutable once written. The
//! [`DatasetRow`] trait ties a record type to its column list, its sqlx
//! parameter binding, and its delimited export form, so the persistence sink
//! can stay generic without resorting to key-value maps.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteArguments;
use sqlx::query::Query;
use sqlx::Sqlite;

/// Field delimiter used by the export endpoint.
pub const EXPORT_DELIMITER: &str = ";";

/// The closed set of datasets a crawl writes and the export endpoint serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Urls,
    Redirects,
    BrokenLinks,
    DuplicatesTitles,
    DuplicatesMeta,
    Images,
    StructuredData,
}

impl Dataset {
    /// Parse a dataset name as used in export URLs. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "urls" => Some(Dataset::Urls),
            "redirects" => Some(Dataset::Redirects),
            "broken_links" => Some(Dataset::BrokenLinks),
            "duplicates_titles" => Some(Dataset::DuplicatesTitles),
            "duplicates_meta" => Some(Dataset::DuplicatesMeta),
            "images" => Some(Dataset::Images),
            "structured_data" => Some(Dataset::StructuredData),
            _ => None,
        }
    }

    /// Backing table name. Identical to the dataset name by construction.
    pub fn table(&self) -> &'static str {
        match self {
            Dataset::Urls => "urls",
            Dataset::Redirects => "redirects",
            Dataset::BrokenLinks => "broken_links",
            Dataset::DuplicatesTitles => "duplicates_titles",
            Dataset::DuplicatesMeta => "duplicates_meta",
            Dataset::Images => "images",
            Dataset::StructuredData => "structured_data",
        }
    }

    /// Column names, in table order, used for both INSERT and the CSV header.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Dataset::Urls => UrlRecord::COLUMNS,
            Dataset::Redirects => RedirectRecord::COLUMNS,
            Dataset::BrokenLinks => BrokenLinkRecord::COLUMNS,
            Dataset::DuplicatesTitles | Dataset::DuplicatesMeta => DuplicateRecord::COLUMNS,
            Dataset::Images => ImageRecord::COLUMNS,
            Dataset::StructuredData => StructuredDataRecord::COLUMNS,
        }
    }
}

/// A record type that belongs to one (or, for duplicates, two) datasets.
pub trait DatasetRow {
    const COLUMNS: &'static [&'static str];

    /// Bind this record's fields, in `COLUMNS` order, onto an INSERT query.
    fn bind_values<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>>;

    /// Render this record's fields, in `COLUMNS` order, for delimited export.
    fn export_fields(&self) -> Vec<String>;
}

fn flag(b: bool) -> String {
    if b { "1".to_string() } else { "0".to_string() }
}

/// One row per visited URL, in BFS visitation order.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UrlRecord {
    pub crawl_id: String,
    pub url: String,
    /// 0 means the fetch failed at the transport level.
    pub status_code: i64,
    pub crawl_depth: i64,
    pub canonical: String,
    pub canonical_status: String,
    pub robots: String,
    pub title: String,
    pub title_length: i64,
    pub title_status: String,
    pub meta_description: String,
    pub meta_length: i64,
    pub meta_status: String,
    pub h1_present: bool,
    pub h1_text: String,
}

impl DatasetRow for UrlRecord {
    const COLUMNS: &'static [&'static str] = &[
        "crawl_id",
        "url",
        "status_code",
        "crawl_depth",
        "canonical",
        "canonical_status",
        "robots",
        "title",
        "title_length",
        "title_status",
        "meta_description",
        "meta_length",
        "meta_status",
        "h1_present",
        "h1_text",
    ];

    fn bind_values<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(&self.crawl_id)
            .bind(&self.url)
            .bind(self.status_code)
            .bind(self.crawl_depth)
            .bind(&self.canonical)
            .bind(&self.canonical_status)
            .bind(&self.robots)
            .bind(&self.title)
            .bind(self.title_length)
            .bind(&self.title_status)
            .bind(&self.meta_description)
            .bind(self.meta_length)
            .bind(&self.meta_status)
            .bind(self.h1_present)
            .bind(&self.h1_text)
    }

    fn export_fields(&self) -> Vec<String> {
        vec![
            self.crawl_id.clone(),
            self.url.clone(),
            self.status_code.to_string(),
            self.crawl_depth.to_string(),
            self.canonical.clone(),
            self.canonical_status.clone(),
            self.robots.clone(),
            self.title.clone(),
            self.title_length.to_string(),
            self.title_status.clone(),
            self.meta_description.clone(),
            self.meta_length.to_string(),
            self.meta_status.clone(),
            flag(self.h1_present),
            self.h1_text.clone(),
        ]
    }
}

/// One row per internal redirecting link, with the full resolved chain.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RedirectRecord {
    pub crawl_id: String,
    pub source_url: String,
    /// Number of hops: `chain` entries minus one.
    pub chain_length: i64,
    /// `;`-joined chain from the original target to the final URL.
    pub chain: String,
    pub final_url: String,
    /// `;`-joined HTTP status codes, one per hop.
    pub redirect_types: String,
    pub internal_only: bool,
    pub looped: bool,
}

impl DatasetRow for RedirectRecord {
    const COLUMNS: &'static [&'static str] = &[
        "crawl_id",
        "source_url",
        "chain_length",
        "chain",
        "final_url",
        "redirect_types",
        "internal_only",
        "looped",
    ];

    fn bind_values<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(&self.crawl_id)
            .bind(&self.source_url)
            .bind(self.chain_length)
            .bind(&self.chain)
            .bind(&self.final_url)
            .bind(&self.redirect_types)
            .bind(self.internal_only)
            .bind(self.looped)
    }

    fn export_fields(&self) -> Vec<String> {
        vec![
            self.crawl_id.clone(),
            self.source_url.clone(),
            self.chain_length.to_string(),
            self.chain.clone(),
            self.final_url.clone(),
            self.redirect_types.clone(),
            flag(self.internal_only),
            flag(self.looped),
        ]
    }
}

/// One row per outbound anchor whose target resolved to a status >= 400.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BrokenLinkRecord {
    pub crawl_id: String,
    pub source_url: String,
    pub anchor_text: String,
    /// "internal" or "external" relative to the crawled domain.
    pub direction: String,
    pub target_url: String,
    pub target_status: i64,
    pub first_seen: String,
    pub last_seen: String,
}

impl DatasetRow for BrokenLinkRecord {
    const COLUMNS: &'static [&'static str] = &[
        "crawl_id",
        "source_url",
        "anchor_text",
        "direction",
        "target_url",
        "target_status",
        "first_seen",
        "last_seen",
    ];

    fn bind_values<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(&self.crawl_id)
            .bind(&self.source_url)
            .bind(&self.anchor_text)
            .bind(&self.direction)
            .bind(&self.target_url)
            .bind(self.target_status)
            .bind(&self.first_seen)
            .bind(&self.last_seen)
    }

    fn export_fields(&self) -> Vec<String> {
        vec![
            self.crawl_id.clone(),
            self.source_url.clone(),
            self.anchor_text.clone(),
            self.direction.clone(),
            self.target_url.clone(),
            self.target_status.to_string(),
            self.first_seen.clone(),
            self.last_seen.clone(),
        ]
    }
}

/// Per-page image format counts.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub crawl_id: String,
    pub url: String,
    pub img_count: i64,
    pub legacy_img_count: i64,
    pub webp_avif_count: i64,
}

impl DatasetRow for ImageRecord {
    const COLUMNS: &'static [&'static str] = &[
        "crawl_id",
        "url",
        "img_count",
        "legacy_img_count",
        "webp_avif_count",
    ];

    fn bind_values<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(&self.crawl_id)
            .bind(&self.url)
            .bind(self.img_count)
            .bind(self.legacy_img_count)
            .bind(self.webp_avif_count)
    }

    fn export_fields(&self) -> Vec<String> {
        vec![
            self.crawl_id.clone(),
            self.url.clone(),
            self.img_count.to_string(),
            self.legacy_img_count.to_string(),
            self.webp_avif_count.to_string(),
        ]
    }
}

/// Per-page structured-data presence flags for the fixed schema allow list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct StructuredDataRecord {
    pub crawl_id: String,
    pub url: String,
    pub sd_product: bool,
    pub sd_breadcrumb_list: bool,
    pub sd_article: bool,
    pub sd_faq_page: bool,
    pub sd_web_site: bool,
    pub sd_organization: bool,
    pub sd_offer: bool,
    pub sd_aggregate_rating: bool,
    pub parse_errors: i64,
}

impl DatasetRow for StructuredDataRecord {
    const COLUMNS: &'static [&'static str] = &[
        "crawl_id",
        "url",
        "sd_product",
        "sd_breadcrumb_list",
        "sd_article",
        "sd_faq_page",
        "sd_web_site",
        "sd_organization",
        "sd_offer",
        "sd_aggregate_rating",
        "parse_errors",
    ];

    fn bind_values<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(&self.crawl_id)
            .bind(&self.url)
            .bind(self.sd_product)
            .bind(self.sd_breadcrumb_list)
            .bind(self.sd_article)
            .bind(self.sd_faq_page)
            .bind(self.sd_web_site)
            .bind(self.sd_organization)
            .bind(self.sd_offer)
            .bind(self.sd_aggregate_rating)
            .bind(self.parse_errors)
    }

    fn export_fields(&self) -> Vec<String> {
        vec![
            self.crawl_id.clone(),
            self.url.clone(),
            flag(self.sd_product),
            flag(self.sd_breadcrumb_list),
            flag(self.sd_article),
            flag(self.sd_faq_page),
            flag(self.sd_web_site),
            flag(self.sd_organization),
            flag(self.sd_offer),
            flag(self.sd_aggregate_rating),
            self.parse_errors.to_string(),
        ]
    }
}

/// One row per title or meta-description text shared by two or more URLs.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DuplicateRecord {
    pub crawl_id: String,
    /// Display key only; carries no collision-resistance guarantee.
    pub content_hash: String,
    pub sample: String,
    pub url_count: i64,
    /// Comma-joined sample of contributing URLs, capped to the first ten.
    pub urls_sample: String,
}

impl DatasetRow for DuplicateRecord {
    const COLUMNS: &'static [&'static str] =
        &["crawl_id", "content_hash", "sample", "url_count", "urls_sample"];

    fn bind_values<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(&self.crawl_id)
            .bind(&self.content_hash)
            .bind(&self.sample)
            .bind(self.url_count)
            .bind(&self.urls_sample)
    }

    fn export_fields(&self) -> Vec<String> {
        vec![
            self.crawl_id.clone(),
            self.content_hash.clone(),
            self.sample.clone(),
            self.url_count.to_string(),
            self.urls_sample.clone(),
        ]
    }
}
