// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use serde::{Deserialize, Serialize};

/// Request to start a crawl of one domain.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartCrawlRequest {
    pub domain: String,
}

/// Response after a crawl has been accepted.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartCrawlResponse {
    pub crawl_id: String,
}

/// Query parameters addressing one crawl.
#[derive(Debug, Deserialize)]
pub struct CrawlIdParams {
    pub crawl_id: String,
}

/// Query parameters addressing one domain.
#[derive(Debug, Deserialize)]
pub struct DomainParams {
    pub domain: String,
}

/// Request to (re-)register the monthly schedule for a domain.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub domain: String,
}

/// Generic acknowledgement payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}
