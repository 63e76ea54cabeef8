// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Redirect-chain resolution.
//!
//! Walks a redirecting URL hop by hop with non-redirecting GETs until the
//! chain terminates, errors, revisits a location, or hits the hop bound.

use crate::services::fetcher::{Fetcher, Throttle};
use url::Url;

/// Maximum redirect hops walked per chain.
pub const MAX_REDIRECT_HOPS: usize = 5;

const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// A fully-walked redirect chain, starting at the original target URL.
#[derive(Debug, Clone)]
pub struct RedirectChain {
    /// Visited locations in order, the original URL first.
    pub chain: Vec<String>,
    /// One status code per hop taken.
    pub statuses: Vec<u16>,
    /// Whether the walk stopped because a location recurred.
    pub looped: bool,
}

impl RedirectChain {
    pub fn final_url(&self) -> &str {
        self.chain.last().map(String::as_str).unwrap_or_default()
    }

    /// Hop count: chain entries minus one.
    pub fn hop_count(&self) -> i64 {
        self.chain.len() as i64 - 1
    }
}

/// Walk a redirect chain from `start` to its terminus.
///
/// Each hop is a throttled, non-redirecting GET. A non-redirect response,
/// a redirect without a usable `Location`, or a transport failure ends the
/// walk; a location already seen in this chain sets the loop flag.
pub async fn resolve_chain(fetcher: &Fetcher, throttle: &Throttle, start: &str) -> RedirectChain {
    let mut chain = vec![start.to_string()];
    let mut statuses = Vec::new();
    let mut looped = false;
    let mut current = start.to_string();

    for _ in 0..MAX_REDIRECT_HOPS {
        let response = {
            let _slot = throttle.slot().await;
            fetcher.hop(&current).await
        };
        let Some(response) = response else {
            break;
        };
        let status = response.status().as_u16();
        if !REDIRECT_STATUSES.contains(&status) {
            break;
        }
        let Some(location) = response
            .headers()
            .get("location")
            .and_then(|value| value.to_str().ok())
        else {
            break;
        };
        let Some(next) = Url::parse(&current)
            .ok()
            .and_then(|base| base.join(location).ok())
        else {
            break;
        };
        statuses.push(status);
        let next = next.to_string();
        if chain.contains(&next) {
            looped = true;
            break;
        }
        chain.push(next.clone());
        current = next;
    }

    RedirectChain {
        chain,
        statuses,
        looped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_fetcher() -> (Fetcher, Throttle) {
        (
            Fetcher::new("test-agent/1.0").unwrap(),
            Throttle::new(2, std::time::Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn test_walks_chain_to_terminus() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", "/old")
            .with_status(301)
            .with_header("location", "/interim")
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/interim")
            .with_status(302)
            .with_header("location", "/final")
            .create_async()
            .await;
        let _terminus = server
            .mock("GET", "/final")
            .with_status(200)
            .create_async()
            .await;

        let (fetcher, throttle) = test_fetcher();
        let chain = resolve_chain(&fetcher, &throttle, &format!("{}/old", server.url())).await;

        assert_eq!(chain.hop_count(), 2);
        assert_eq!(chain.statuses, vec![301, 302]);
        assert!(chain.final_url().ends_with("/final"));
        assert!(!chain.looped);
    }

    #[tokio::test]
    async fn test_detects_loop() {
        let mut server = mockito::Server::new_async().await;
        let _a = server
            .mock("GET", "/a")
            .with_status(301)
            .with_header("location", "/b")
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/b")
            .with_status(301)
            .with_header("location", "/a")
            .create_async()
            .await;

        let (fetcher, throttle) = test_fetcher();
        let chain = resolve_chain(&fetcher, &throttle, &format!("{}/a", server.url())).await;

        assert!(chain.looped);
        assert_eq!(chain.chain.len(), 2);
    }

    #[tokio::test]
    async fn test_stops_at_hop_bound() {
        let mut server = mockito::Server::new_async().await;
        for i in 0..8 {
            server
                .mock("GET", format!("/hop{i}").as_str())
                .with_status(301)
                .with_header("location", &format!("/hop{}", i + 1))
                .create_async()
                .await;
        }

        let (fetcher, throttle) = test_fetcher();
        let chain = resolve_chain(&fetcher, &throttle, &format!("{}/hop0", server.url())).await;

        assert_eq!(chain.hop_count() as usize, MAX_REDIRECT_HOPS);
        assert_eq!(chain.statuses.len(), MAX_REDIRECT_HOPS);
        assert!(!chain.looped);
    }

    #[tokio::test]
    async fn test_redirect_without_location_ends_walk() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/broken-redirect")
            .with_status(301)
            .create_async()
            .await;

        let (fetcher, throttle) = test_fetcher();
        let chain = resolve_chain(
            &fetcher,
            &throttle,
            &format!("{}/broken-redirect", server.url()),
        )
        .await;

        assert_eq!(chain.hop_count(), 0);
        assert!(chain.statuses.is_empty());
    }
}
