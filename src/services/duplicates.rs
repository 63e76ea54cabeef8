// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Cross-page duplicate-content detection.
//!
//! The index lives for one crawl. Titles and meta descriptions feed two
//! separate maps from normalized content text to contributing URLs; at crawl
//! completion, every key shared by two or more URLs becomes a record.

use crate::models::records::DuplicateRecord;
use std::collections::HashMap;

const SAMPLE_MAX_CHARS: usize = 180;
const URLS_SAMPLE_CAP: usize = 10;

/// Title and meta-description content indexes for one crawl.
#[derive(Debug, Default)]
pub struct DuplicateIndex {
    titles: HashMap<String, Vec<String>>,
    metas: HashMap<String, Vec<String>>,
}

impl DuplicateIndex {
    /// Feed one visited page's title and meta description into the index.
    /// Empty signals are not indexed; keys are trimmed and lower-cased.
    pub fn record_page(&mut self, url: &str, title: &str, meta_description: &str) {
        if !title.is_empty() {
            self.titles
                .entry(title.trim().to_lowercase())
                .or_default()
                .push(url.to_string());
        }
        if !meta_description.is_empty() {
            self.metas
                .entry(meta_description.trim().to_lowercase())
                .or_default()
                .push(url.to_string());
        }
    }

    /// Emit one record per content key with more than one contributing URL:
    /// `(duplicate titles, duplicate meta descriptions)`.
    pub fn into_records(self, crawl_id: &str) -> (Vec<DuplicateRecord>, Vec<DuplicateRecord>) {
        (
            collisions(self.titles, crawl_id),
            collisions(self.metas, crawl_id),
        )
    }
}

fn collisions(index: HashMap<String, Vec<String>>, crawl_id: &str) -> Vec<DuplicateRecord> {
    index
        .into_iter()
        .filter(|(_, urls)| urls.len() > 1)
        .map(|(key, urls)| DuplicateRecord {
            crawl_id: crawl_id.to_string(),
            // Display key only, no collision-resistance guarantee intended.
            content_hash: format!("{:x}", md5::compute(&key)),
            sample: key.chars().take(SAMPLE_MAX_CHARS).collect(),
            url_count: urls.len() as i64,
            urls_sample: urls
                .iter()
                .take(URLS_SAMPLE_CAP)
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect()
}
