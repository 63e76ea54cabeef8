// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Crawl orchestration: breadth-first traversal of one domain, from seed
//! URL to persisted audit datasets and summary.

use crate::models::crawl::{CrawlOutcome, CrawlProgress, CrawlStatus, CrawlSummary, SummaryMetrics};
use crate::models::records::{
    BrokenLinkRecord, Dataset, ImageRecord, RedirectRecord, StructuredDataRecord, UrlRecord,
};
use crate::services::analyzer::{
    analyze, classify_canonical, classify_meta_len, classify_title_len, PageAnalysis,
};
use crate::services::controller::CrawlController;
use crate::services::duplicates::DuplicateIndex;
use crate::services::fetcher::{Fetcher, Throttle};
use crate::services::links::LinkAuditor;
use crate::services::robots::PolitenessGate;
use crate::services::storage::StorageClient;
use crate::services::url_norm::{canonicalize, is_http, same_host};
use anyhow::Result;
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use tracing::{info, warn};

/// BFS depth bound, counted from the seed at depth 0.
pub const DEFAULT_MAX_DEPTH: usize = 6;
/// Hard cap on visited URLs per crawl.
pub const DEFAULT_MAX_URLS: usize = 50_000;

const EXCLUDED_PATHS: [&str; 3] = ["/wp-admin/", "/cart/", "/checkout/"];
const EXCLUDED_QUERIES: [&str; 3] = ["?add-to-cart=", "?orderby=", "?s="];

/// Traversal bounds for one crawl run.
#[derive(Debug, Clone, Copy)]
pub struct CrawlConfig {
    pub max_depth: usize,
    pub max_urls: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_urls: DEFAULT_MAX_URLS,
        }
    }
}

/// Rows accumulated across the traversal, flushed once at finalization.
#[derive(Default)]
struct CrawlRows {
    urls: Vec<UrlRecord>,
    redirects: Vec<RedirectRecord>,
    broken: Vec<BrokenLinkRecord>,
    images: Vec<ImageRecord>,
    structured: Vec<StructuredDataRecord>,
    duplicates: DuplicateIndex,
}

struct CrawlRun<'a> {
    storage: &'a StorageClient,
    controller: &'a CrawlController,
    crawl_id: &'a str,
    domain: &'a str,
    seed_url: String,
    started_at: String,
    config: CrawlConfig,
    gate: PolitenessGate,
    fetcher: Fetcher,
    throttle: Throttle,
}

/// Crawl `domain` breadth-first and persist every dataset plus the summary.
///
/// Traversal errors are absorbed per URL (failed fetches become status-0
/// rows); only setup and persistence errors surface. Rows written by a run
/// that was stopped mid-crawl stay persisted, under a `stopped` summary.
pub async fn run_crawl(
    storage: &StorageClient,
    controller: &CrawlController,
    domain: &str,
    crawl_id: &str,
    config: CrawlConfig,
) -> Result<CrawlOutcome> {
    let seed_url = format!("{}/", domain.trim_end_matches('/'));
    info!(crawl_id, domain, "starting crawl");

    let gate = PolitenessGate::load(&seed_url).await;
    info!(crawl_id, user_agent = gate.user_agent(), "crawl identity selected");
    let fetcher = Fetcher::new(gate.user_agent())?;

    let run = CrawlRun {
        storage,
        controller,
        crawl_id,
        domain,
        seed_url,
        started_at: Utc::now().to_rfc3339(),
        config,
        gate,
        fetcher,
        throttle: Throttle::default(),
    };
    let mut rows = CrawlRows::default();
    let stopped = run.traverse(&mut rows).await;
    run.finalize(rows, stopped).await
}

impl CrawlRun<'_> {
    /// Walk the frontier until it drains, the URL cap is reached, or a stop
    /// request arrives. Returns whether the run was stopped.
    async fn traverse(&self, rows: &mut CrawlRows) -> bool {
        let mut visited: HashSet<String> = HashSet::new();
        let mut frontier: VecDeque<(String, usize)> = VecDeque::from([(self.seed_url.clone(), 0)]);

        while visited.len() < self.config.max_urls {
            if self.controller.is_stopped(self.crawl_id) {
                info!(crawl_id = self.crawl_id, "stop requested, halting traversal");
                return true;
            }
            let Some((url, depth)) = frontier.pop_front() else {
                break;
            };
            if depth > self.config.max_depth {
                continue;
            }
            let Some(page_url) = canonicalize(&url) else {
                continue;
            };
            if visited.contains(&page_url) || self.excluded(&page_url) {
                continue;
            }
            visited.insert(page_url.clone());
            self.report_progress(visited.len(), &page_url);

            let discovered = self.visit_page(&page_url, depth, rows).await;
            if depth < self.config.max_depth {
                for target in discovered {
                    match canonicalize(&target) {
                        Some(seen) if visited.contains(&seen) => {}
                        _ => frontier.push_back((target, depth + 1)),
                    }
                }
            }
        }
        false
    }

    /// Frontier candidates that must not be fetched: off-scheme, off-host,
    /// excluded path or query fragments, or disallowed by robots rules.
    fn excluded(&self, page_url: &str) -> bool {
        !is_http(page_url)
            || !same_host(page_url, &self.seed_url)
            || EXCLUDED_PATHS.iter().any(|p| page_url.contains(p))
            || EXCLUDED_QUERIES.iter().any(|q| page_url.contains(q))
            || !self.gate.allowed(page_url)
    }

    fn report_progress(&self, visited: usize, page_url: &str) {
        let pct = (100 * visited / self.config.max_urls).min(100) as u8;
        self.controller.set_progress(
            self.crawl_id,
            CrawlProgress {
                progress_0_100: pct,
                current_url: page_url.to_string(),
                finished: false,
            },
        );
    }

    /// Fetch and analyze one page, record all its rows, and return the
    /// internal link targets found on it.
    async fn visit_page(&self, page_url: &str, depth: usize, rows: &mut CrawlRows) -> Vec<String> {
        let response = {
            let _permit = self.throttle.pace().await;
            self.fetcher.fetch(page_url).await
        };
        let (status, body) = match response {
            Some(resp) => {
                let status = resp.status().as_u16();
                (status, resp.text().await.unwrap_or_default())
            }
            None => {
                warn!(url = page_url, "page fetch failed");
                (0, String::new())
            }
        };
        let analysis = analyze(&body);

        rows.urls
            .push(self.url_record(page_url, depth, status, &analysis));
        rows.duplicates
            .record_page(page_url, &analysis.title, &analysis.meta_description);

        let auditor = LinkAuditor::new(
            &self.fetcher,
            &self.throttle,
            self.crawl_id,
            &self.seed_url,
            &self.started_at,
        );
        let audit = auditor.audit_page(page_url, &analysis.anchors).await;
        rows.broken.extend(audit.broken);
        rows.redirects.extend(audit.redirects);

        rows.images.push(ImageRecord {
            crawl_id: self.crawl_id.to_string(),
            url: page_url.to_string(),
            img_count: analysis.images.total,
            legacy_img_count: analysis.images.legacy,
            webp_avif_count: analysis.images.modern,
        });
        rows.structured
            .push(analysis.structured.into_record(self.crawl_id, page_url));

        audit.internal_targets
    }

    fn url_record(
        &self,
        page_url: &str,
        depth: usize,
        status: u16,
        analysis: &PageAnalysis,
    ) -> UrlRecord {
        let title_length = analysis.title.chars().count() as i64;
        let meta_length = analysis.meta_description.chars().count() as i64;
        let canonical_status = classify_canonical(page_url, &analysis.canonical_href, &self.seed_url);
        UrlRecord {
            crawl_id: self.crawl_id.to_string(),
            url: page_url.to_string(),
            status_code: i64::from(status),
            crawl_depth: depth as i64,
            canonical: analysis.canonical_href.clone(),
            canonical_status: canonical_status.as_str().to_string(),
            robots: analysis.robots_meta.clone(),
            title: analysis.title.clone(),
            title_length,
            title_status: classify_title_len(title_length).to_string(),
            meta_description: analysis.meta_description.clone(),
            meta_length,
            meta_status: classify_meta_len(meta_length).to_string(),
            h1_present: !analysis.h1_text.is_empty(),
            h1_text: analysis.h1_text.clone(),
        }
    }

    /// Persist every dataset and the crawl summary, then mark the crawl done.
    async fn finalize(&self, rows: CrawlRows, stopped: bool) -> Result<CrawlOutcome> {
        let CrawlRows {
            urls,
            redirects,
            broken,
            images,
            structured,
            duplicates,
        } = rows;
        let (dup_titles, dup_meta) = duplicates.into_records(self.crawl_id);

        self.storage.insert_many(Dataset::Urls, &urls).await?;
        self.storage.insert_many(Dataset::Redirects, &redirects).await?;
        self.storage.insert_many(Dataset::BrokenLinks, &broken).await?;
        self.storage.insert_many(Dataset::Images, &images).await?;
        self.storage
            .insert_many(Dataset::StructuredData, &structured)
            .await?;
        self.storage
            .insert_many(Dataset::DuplicatesTitles, &dup_titles)
            .await?;
        self.storage
            .insert_many(Dataset::DuplicatesMeta, &dup_meta)
            .await?;

        let total = urls.len() as i64;
        let missing_h1 = urls.iter().filter(|r| !r.h1_present).count();
        let missing_h1_pct = (1000.0 * missing_h1 as f64 / total.max(1) as f64).round() / 10.0;
        let summary = CrawlSummary {
            started_at: self.started_at.clone(),
            finished_at: Utc::now().to_rfc3339(),
            metrics: SummaryMetrics {
                urls: total,
                broken_links: broken.len() as i64,
                redirects: redirects.len() as i64,
                missing_h1_pct,
                duplicates_titles: dup_titles.len() as i64,
                duplicates_meta: dup_meta.len() as i64,
                images: images.len() as i64,
                structured_data: structured.len() as i64,
            },
        };
        let status = if stopped {
            CrawlStatus::Stopped
        } else {
            CrawlStatus::Finished
        };
        self.storage
            .write_summary(self.crawl_id, self.domain, status, total, &summary)
            .await?;
        self.controller.mark_finished(self.crawl_id);
        info!(crawl_id = self.crawl_id, total, %status, "crawl complete");
        Ok(CrawlOutcome {
            status,
            total_urls: total,
            summary,
        })
    }
}
