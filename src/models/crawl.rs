// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one crawl run. A crawl is mutable only while `Running`;
/// once it reaches `Finished` or `Stopped` its rows are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Running,
    Finished,
    Stopped,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlStatus::Running => "running",
            CrawlStatus::Finished => "finished",
            CrawlStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate metrics computed when a crawl finalizes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub urls: i64,
    pub broken_links: i64,
    pub redirects: i64,
    pub missing_h1_pct: f64,
    pub duplicates_titles: i64,
    pub duplicates_meta: i64,
    pub images: i64,
    pub structured_data: i64,
}

/// Crawl summary persisted as JSON alongside the crawl row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub started_at: String,
    pub finished_at: String,
    pub metrics: SummaryMetrics,
}

impl CrawlSummary {
    /// Summary for a crawl that has just been requested and has no metrics yet.
    pub fn started(started_at: String) -> Self {
        Self {
            started_at,
            ..Self::default()
        }
    }
}

/// Live progress snapshot for an in-flight crawl, readable from any task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlProgress {
    pub progress_0_100: u8,
    pub current_url: String,
    pub finished: bool,
}

/// Final result of one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub status: CrawlStatus,
    pub total_urls: i64,
    pub summary: CrawlSummary,
}

/// Most recent finished crawl for a domain, as served by `/crawl/latest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestCrawl {
    pub crawl_id: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub summary_metrics: SummaryMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_serde() {
        let json = serde_json::to_string(&CrawlStatus::Stopped).unwrap();
        assert_eq!(json, "\"stopped\"");
        let back: CrawlStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CrawlStatus::Stopped);
    }

    #[test]
    fn test_started_summary_has_no_metrics() {
        let summary = CrawlSummary::started("2026-01-01T00:00:00Z".to_string());
        assert_eq!(summary.started_at, "2026-01-01T00:00:00Z");
        assert!(summary.finished_at.is_empty());
        assert_eq!(summary.metrics.urls, 0);
    }
}
