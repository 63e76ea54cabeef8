// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! HTTP fetching and rate limiting.
//!
//! The [`Throttle`] is the only concurrency primitive in a crawl: at most
//! `max_in_flight` requests run at once, and page fetches additionally wait a
//! fixed spacing after acquiring a slot. The [`Fetcher`] absorbs transport
//! failures instead of propagating them; callers encode a failed request as
//! status 0 and move on.

use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::sleep;

/// Maximum simultaneous fetches per crawl.
pub const MAX_IN_FLIGHT_FETCHES: usize = 2;
/// Minimum spacing before each page fetch starts.
pub const FETCH_SPACING: Duration = Duration::from_millis(500);
/// Timeout for page fetches and probe GET fallbacks.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
/// Timeout for HEAD probes and redirect-chain hops.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Concurrency and spacing gate shared by all network calls of one crawl.
pub struct Throttle {
    permits: Semaphore,
    spacing: Duration,
}

impl Throttle {
    pub fn new(max_in_flight: usize, spacing: Duration) -> Self {
        Self {
            permits: Semaphore::new(max_in_flight),
            spacing,
        }
    }

    /// Acquire a slot for a page fetch, then wait the inter-fetch spacing.
    /// The fetch must start while the returned permit is held.
    pub async fn pace(&self) -> SemaphorePermit<'_> {
        let permit = self
            .permits
            .acquire()
            .await
            .expect("throttle semaphore closed");
        sleep(self.spacing).await;
        permit
    }

    /// Acquire a slot for an auxiliary probe or redirect hop, without the
    /// inter-fetch spacing.
    pub async fn slot(&self) -> SemaphorePermit<'_> {
        self.permits
            .acquire()
            .await
            .expect("throttle semaphore closed")
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(MAX_IN_FLIGHT_FETCHES, FETCH_SPACING)
    }
}

/// HTTP client pair presenting one crawl identity: one client follows
/// redirects (page fetches), the other never does (probes and chain hops).
pub struct Fetcher {
    follow: reqwest::Client,
    no_redirect: reqwest::Client,
}

impl Fetcher {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let follow = reqwest::Client::builder().user_agent(user_agent).build()?;
        let no_redirect = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            follow,
            no_redirect,
        })
    }

    /// GET a page, following redirects. Transport failure yields `None`;
    /// the caller records it as status 0.
    pub async fn fetch(&self, url: &str) -> Option<reqwest::Response> {
        self.follow
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .ok()
    }

    /// Probe the live status of a link without following redirects.
    ///
    /// HEAD first; if the transport fails or the origin rejects the method
    /// (405/501), fall back to a non-redirecting GET. Both failing yields 0.
    pub async fn probe(&self, url: &str) -> u16 {
        match self.no_redirect.head(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(resp) if !matches!(resp.status().as_u16(), 405 | 501) => resp.status().as_u16(),
            _ => match self.no_redirect.get(url).timeout(FETCH_TIMEOUT).send().await {
                Ok(resp) => resp.status().as_u16(),
                Err(_) => 0,
            },
        }
    }

    /// Single non-redirecting GET used while walking a redirect chain.
    pub async fn hop(&self, url: &str) -> Option<reqwest::Response> {
        self.no_redirect
            .get(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .ok()
    }
}
