// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! robots.txt policy and crawl identity selection.
//!
//! The gate is loaded once per crawl, before traversal begins. The crawler
//! prefers presenting as Google's mobile crawler; if the site's rules bar
//! that identity from the seed URL, it self-identifies for the whole run
//! instead. An unreachable or unparseable robots.txt permits everything.

use texting_robots::{get_robots_url, Robot};
use tracing::warn;

/// Preferred crawl identity: a well-known search-engine mobile crawler.
pub const GOOGLE_MOBILE_UA: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Mobile Safari/537.36 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";
/// Self-identifying fallback when the preferred identity is disallowed.
pub const FALLBACK_UA: &str = "SeoAuditBot/1.0";

/// Loaded robots.txt rules plus the identity chosen for the run.
pub struct PolitenessGate {
    robot: Option<Robot>,
    user_agent: &'static str,
}

impl PolitenessGate {
    /// Fetch and parse the domain's robots.txt, then fix the crawl identity.
    pub async fn load(seed_url: &str) -> Self {
        let robots_txt = match get_robots_url(seed_url) {
            Ok(robots_url) => fetch_robots_txt(&robots_url).await,
            Err(e) => {
                warn!(seed_url, error = %e, "could not derive robots.txt URL, permitting everything");
                String::new()
            }
        };
        Self::from_rules(seed_url, &robots_txt)
    }

    /// Build a gate from raw robots.txt text. Split out of `load` so the
    /// identity-selection rules are testable without a server.
    pub fn from_rules(seed_url: &str, robots_txt: &str) -> Self {
        match Robot::new(GOOGLE_MOBILE_UA, robots_txt.as_bytes()) {
            Ok(robot) if robot.allowed(seed_url) => Self {
                robot: Some(robot),
                user_agent: GOOGLE_MOBILE_UA,
            },
            Ok(_) => {
                // The preferred identity may not fetch the seed; present the
                // fallback identity for the entire run instead.
                let robot = Robot::new(FALLBACK_UA, robots_txt.as_bytes()).ok();
                Self {
                    robot,
                    user_agent: FALLBACK_UA,
                }
            }
            Err(e) => {
                warn!(error = %e, "unparseable robots.txt, permitting everything");
                Self {
                    robot: None,
                    user_agent: GOOGLE_MOBILE_UA,
                }
            }
        }
    }

    /// Whether the active identity may fetch this URL.
    pub fn allowed(&self, url: &str) -> bool {
        self.robot.as_ref().is_none_or(|robot| robot.allowed(url))
    }

    /// The identity presented for the whole run.
    pub fn user_agent(&self) -> &'static str {
        self.user_agent
    }
}

async fn fetch_robots_txt(robots_url: &str) -> String {
    let client = reqwest::Client::new();
    match client.get(robots_url).send().await {
        Ok(response) if response.status().is_success() => {
            response.text().await.unwrap_or_default()
        }
        Ok(response) => {
            warn!(robots_url, status = %response.status(), "robots.txt not available, permitting everything");
            String::new()
        }
        Err(e) => {
            warn!(robots_url, error = %e, "robots.txt fetch failed, permitting everything");
            String::new()
        }
    }
}
