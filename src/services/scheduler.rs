// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Recurring monthly crawls: one background task per scheduled domain,
//! firing on the first Monday of each month at 09:00 UTC.

use crate::models::crawl::{CrawlStatus, CrawlSummary};
use crate::services::controller::CrawlController;
use crate::services::crawler::{run_crawl, CrawlConfig};
use crate::services::storage::StorageClient;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};
use uuid::Uuid;

/// Registry of per-domain recurring crawl tasks.
pub struct MonthlyScheduler {
    storage: StorageClient,
    controller: CrawlController,
    config: CrawlConfig,
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl MonthlyScheduler {
    pub fn new(storage: StorageClient, controller: CrawlController, config: CrawlConfig) -> Self {
        Self {
            storage,
            controller,
            config,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Schedule `domain` for monthly crawls. Scheduling a domain that is
    /// already scheduled replaces its task.
    pub fn schedule(&self, domain: &str) {
        let handle = tokio::spawn(run_monthly(
            self.storage.clone(),
            self.controller.clone(),
            self.config,
            domain.to_string(),
        ));
        let mut jobs = self.jobs.lock().expect("scheduler lock poisoned");
        if let Some(previous) = jobs.insert(domain.to_string(), handle) {
            previous.abort();
        }
        info!(domain, "monthly crawl scheduled");
    }

    /// Remove the schedule for `domain`. Returns whether one existed.
    pub fn unschedule(&self, domain: &str) -> bool {
        let removed = self
            .jobs
            .lock()
            .expect("scheduler lock poisoned")
            .remove(domain);
        match removed {
            Some(handle) => {
                handle.abort();
                info!(domain, "monthly crawl unscheduled");
                true
            }
            None => false,
        }
    }
}

async fn run_monthly(
    storage: StorageClient,
    controller: CrawlController,
    config: CrawlConfig,
    domain: String,
) {
    loop {
        let now = Utc::now();
        let next = next_first_monday(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(domain, fire_at = %next, "monthly crawl waiting");
        sleep(wait).await;

        let crawl_id = Uuid::new_v4().to_string();
        info!(domain, crawl_id, "monthly crawl firing");
        let placeholder = CrawlSummary::started(Utc::now().to_rfc3339());
        if let Err(error) = storage
            .write_summary(&crawl_id, &domain, CrawlStatus::Running, 0, &placeholder)
            .await
        {
            error!(domain, crawl_id, %error, "failed to record scheduled crawl");
            continue;
        }
        if let Err(error) = run_crawl(&storage, &controller, &domain, &crawl_id, config).await {
            error!(domain, crawl_id, %error, "scheduled crawl failed");
        }
    }
}

/// First Monday of a month at 09:00 UTC, strictly after `after`.
pub fn next_first_monday(after: DateTime<Utc>) -> DateTime<Utc> {
    let mut year = after.year();
    let mut month = after.month();
    loop {
        let candidate = first_monday_at_nine(year, month);
        if candidate > after {
            return candidate;
        }
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
}

fn first_monday_at_nine(year: i32, month: u32) -> DateTime<Utc> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month start");
    let shift = i64::from((7 - first.weekday().num_days_from_monday()) % 7);
    (first + ChronoDuration::days(shift))
        .and_hms_opt(9, 0, 0)
        .expect("valid fire time")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn test_fires_on_month_start_when_it_is_a_monday() {
        // 2024-01-01 was a Monday.
        let next = next_first_monday(utc(2023, 12, 31, 0, 0));
        assert_eq!(next, utc(2024, 1, 1, 9, 0));
    }

    #[test]
    fn test_same_day_before_nine_still_fires() {
        let next = next_first_monday(utc(2024, 1, 1, 8, 59));
        assert_eq!(next, utc(2024, 1, 1, 9, 0));
    }

    #[test]
    fn test_rolls_to_next_month_once_past() {
        // 2024-02-01 was a Thursday; the first Monday is the 5th.
        let next = next_first_monday(utc(2024, 1, 1, 10, 0));
        assert_eq!(next, utc(2024, 2, 5, 9, 0));
    }

    #[test]
    fn test_rolls_over_year_boundary() {
        // 2024-12-02 is the first Monday of December 2024.
        let next = next_first_monday(utc(2024, 12, 2, 9, 0));
        // 2025-01-06 is the first Monday of January 2025.
        assert_eq!(next, utc(2025, 1, 6, 9, 0));
    }
}
