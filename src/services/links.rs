// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Per-page outgoing-link audit.
//!
//! Every anchor on a page is resolved to an absolute URL and probed once.
//! Client and server errors become broken-link rows, internal redirects get
//! their chains walked, and healthy internal targets are handed back to the
//! crawler as frontier candidates.

use crate::models::records::{BrokenLinkRecord, RedirectRecord};
use crate::services::analyzer::Anchor;
use crate::services::fetcher::{Fetcher, Throttle};
use crate::services::redirects::resolve_chain;
use crate::services::url_norm::{is_http, same_host};
use url::Url;

/// Everything the audit of one page produced.
#[derive(Debug, Default)]
pub struct LinkAudit {
    pub broken: Vec<BrokenLinkRecord>,
    pub redirects: Vec<RedirectRecord>,
    /// Absolute internal link targets found on the page, in document order.
    pub internal_targets: Vec<String>,
}

/// Probes the outgoing links of fetched pages.
pub struct LinkAuditor<'a> {
    fetcher: &'a Fetcher,
    throttle: &'a Throttle,
    crawl_id: &'a str,
    seed_url: &'a str,
    /// Crawl start timestamp, stamped on broken-link rows.
    started_at: &'a str,
}

impl<'a> LinkAuditor<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        throttle: &'a Throttle,
        crawl_id: &'a str,
        seed_url: &'a str,
        started_at: &'a str,
    ) -> Self {
        Self {
            fetcher,
            throttle,
            crawl_id,
            seed_url,
            started_at,
        }
    }

    /// Audit all anchors found on `page_url`.
    pub async fn audit_page(&self, page_url: &str, anchors: &[Anchor]) -> LinkAudit {
        let mut audit = LinkAudit::default();
        let Ok(base) = Url::parse(page_url) else {
            return audit;
        };
        for anchor in anchors {
            let Ok(target) = base.join(anchor.href.trim()) else {
                continue;
            };
            let target = target.to_string();
            if !is_http(&target) {
                continue;
            }
            let internal = same_host(&target, self.seed_url);
            let status = {
                let _slot = self.throttle.slot().await;
                self.fetcher.probe(&target).await
            };
            if status >= 400 {
                audit.broken.push(self.broken_row(page_url, anchor, &target, status, internal));
            } else if (300..400).contains(&status) && internal {
                audit.redirects.push(self.redirect_row(page_url, &target).await);
            }
            if internal {
                audit.internal_targets.push(target);
            }
        }
        audit
    }

    fn broken_row(
        &self,
        page_url: &str,
        anchor: &Anchor,
        target: &str,
        status: u16,
        internal: bool,
    ) -> BrokenLinkRecord {
        BrokenLinkRecord {
            crawl_id: self.crawl_id.to_string(),
            source_url: page_url.to_string(),
            anchor_text: anchor.text.clone(),
            direction: if internal { "internal" } else { "external" }.to_string(),
            target_url: target.to_string(),
            target_status: i64::from(status),
            first_seen: self.started_at.to_string(),
            last_seen: self.started_at.to_string(),
        }
    }

    async fn redirect_row(&self, page_url: &str, target: &str) -> RedirectRecord {
        let walked = resolve_chain(self.fetcher, self.throttle, target).await;
        let internal_only = walked.chain.iter().all(|hop| same_host(hop, self.seed_url));
        RedirectRecord {
            crawl_id: self.crawl_id.to_string(),
            source_url: page_url.to_string(),
            chain_length: walked.hop_count(),
            chain: walked.chain.join(";"),
            final_url: walked.final_url().to_string(),
            redirect_types: walked
                .statuses
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";"),
            internal_only,
            looped: walked.looped,
        }
    }
}
