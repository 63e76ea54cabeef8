// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Process-wide crawl control registry.
//!
//! Keyed by crawl id, the controller carries the stop flags set by stop
//! requests and the progress snapshots written after every visited page.
//! It is the only structure mutated from outside a crawl's own task, so all
//! access goes through one lock. Entries persist for the process lifetime;
//! crawl ids are bounded by operator-triggered runs, not request traffic.

use crate::models::crawl::CrawlProgress;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct ControllerInner {
    stops: HashSet<String>,
    progress: HashMap<String, CrawlProgress>,
}

/// Cloneable handle to the shared registry.
#[derive(Debug, Clone, Default)]
pub struct CrawlController {
    inner: Arc<Mutex<ControllerInner>>,
}

impl CrawlController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a crawl to stop. Takes effect at the crawl's next
    /// frontier-pop check; in-flight page work runs to completion.
    pub fn stop(&self, crawl_id: &str) {
        let mut inner = self.inner.lock().expect("controller lock poisoned");
        inner.stops.insert(crawl_id.to_string());
    }

    /// Polled by the orchestrator once per frontier pop.
    pub fn is_stopped(&self, crawl_id: &str) -> bool {
        let inner = self.inner.lock().expect("controller lock poisoned");
        inner.stops.contains(crawl_id)
    }

    /// Overwrite the progress snapshot for a crawl.
    pub fn set_progress(&self, crawl_id: &str, progress: CrawlProgress) {
        let mut inner = self.inner.lock().expect("controller lock poisoned");
        inner.progress.insert(crawl_id.to_string(), progress);
    }

    /// Latest progress snapshot, from any task.
    pub fn progress(&self, crawl_id: &str) -> Option<CrawlProgress> {
        let inner = self.inner.lock().expect("controller lock poisoned");
        inner.progress.get(crawl_id).cloned()
    }

    /// Mark a crawl's snapshot complete once finalization is done.
    pub fn mark_finished(&self, crawl_id: &str) {
        let mut inner = self.inner.lock().expect("controller lock poisoned");
        inner.progress.insert(
            crawl_id.to_string(),
            CrawlProgress {
                progress_0_100: 100,
                current_url: "done".to_string(),
                finished: true,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_flag_is_per_crawl() {
        let controller = CrawlController::new();
        controller.stop("crawl-a");
        assert!(controller.is_stopped("crawl-a"));
        assert!(!controller.is_stopped("crawl-b"));
    }

    #[test]
    fn test_progress_overwrites() {
        let controller = CrawlController::new();
        controller.set_progress(
            "crawl-a",
            CrawlProgress {
                progress_0_100: 10,
                current_url: "https://a.com/1/".to_string(),
                finished: false,
            },
        );
        controller.set_progress(
            "crawl-a",
            CrawlProgress {
                progress_0_100: 20,
                current_url: "https://a.com/2/".to_string(),
                finished: false,
            },
        );

        let progress = controller.progress("crawl-a").unwrap();
        assert_eq!(progress.progress_0_100, 20);
        assert_eq!(progress.current_url, "https://a.com/2/");
    }

    #[test]
    fn test_unknown_crawl_has_no_progress() {
        let controller = CrawlController::new();
        assert!(controller.progress("nope").is_none());
    }

    #[test]
    fn test_mark_finished() {
        let controller = CrawlController::new();
        controller.mark_finished("crawl-a");
        let progress = controller.progress("crawl-a").unwrap();
        assert!(progress.finished);
        assert_eq!(progress.progress_0_100, 100);
    }

    #[test]
    fn test_registry_is_shared_across_clones() {
        let controller = CrawlController::new();
        let clone = controller.clone();
        clone.stop("crawl-a");
        assert!(controller.is_stopped("crawl-a"));
    }
}
