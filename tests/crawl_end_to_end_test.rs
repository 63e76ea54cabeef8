// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Full crawl runs against a mock site: traversal, robots enforcement,
//! link auditing, redirect chains, duplicates, and the persisted datasets.

use seo_audit_agent::models::crawl::CrawlStatus;
use seo_audit_agent::models::records::Dataset;
use seo_audit_agent::services::controller::CrawlController;
use seo_audit_agent::services::crawler::{run_crawl, CrawlConfig};
use seo_audit_agent::services::storage::StorageClient;
use tempfile::TempDir;

async fn test_storage() -> (StorageClient, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let database_url = format!("sqlite://{}/crawl.sqlite?mode=rwc", dir.path().display());
    let storage = StorageClient::connect(&database_url)
        .await
        .expect("open test database");
    (storage, dir)
}

fn home_page(base: &str, external: &str) -> String {
    format!(
        concat!(
            "<html><head>",
            "<title>Tiny Shop</title>",
            "<meta name=\"description\" content=\"Hand-picked widgets, gadgets and spare parts ",
            "with same-day dispatch across the country.\">",
            "<link rel=\"canonical\" href=\"{base}/\">",
            "<script type=\"application/ld+json\">{{\"@type\":\"Product\",\"name\":\"Widget\"}}</script>",
            "</head><body>",
            "<h1>Welcome</h1>",
            "<a href=\"/about\">About</a>",
            "<a href=\"/old\">Old</a>",
            "<a href=\"/new\">New</a>",
            "<a href=\"/private/page\">Private</a>",
            "<a href=\"{external}/gone\">Partner</a>",
            "<a href=\"mailto:shop@example.com\">Mail</a>",
            "<img src=\"/a.jpg\"><img src=\"/b.webp\">",
            "</body></html>",
        ),
        base = base,
        external = external,
    )
}

const ABOUT_PAGE: &str =
    "<html><head><title>About Us</title></head><body><p>No heading here.</p></body></html>";
const MOVED_PAGE: &str =
    "<html><head><title>Moved Page</title></head><body><h1>Moved</h1></body></html>";

#[tokio::test]
async fn test_full_crawl_of_small_site() {
    let mut server = mockito::Server::new_async().await;
    let mut external = mockito::Server::new_async().await;
    let base = server.url();

    server
        .mock("GET", "/robots.txt")
        .with_status(200)
        .with_body("User-agent: *\nDisallow: /private/\n")
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_body(home_page(&base, &external.url()))
        .expect(1)
        .create_async()
        .await;
    // Link probes and chain hops hit the anchor URLs as written; page
    // fetches hit the canonical form with the trailing slash.
    server
        .mock("GET", "/about")
        .with_status(200)
        .with_body(ABOUT_PAGE)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/about/")
        .with_status(200)
        .with_body(ABOUT_PAGE)
        .expect(1)
        .create_async()
        .await;
    // Link probe plus one chain hop.
    server
        .mock("GET", "/old")
        .with_status(301)
        .with_header("location", "/new")
        .expect(2)
        .create_async()
        .await;
    // Page fetch of the canonical /old/, followed through to /new.
    server
        .mock("GET", "/old/")
        .with_status(301)
        .with_header("location", "/new")
        .expect(1)
        .create_async()
        .await;
    // Chain hop, link probe, and the redirect target of the /old/ fetch.
    server
        .mock("GET", "/new")
        .with_status(200)
        .with_body(MOVED_PAGE)
        .expect(3)
        .create_async()
        .await;
    server
        .mock("GET", "/new/")
        .with_status(200)
        .with_body(MOVED_PAGE)
        .expect(1)
        .create_async()
        .await;
    // Robots rules bar the page fetch but not the link probe.
    let private = server
        .mock("GET", "/private/page")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let gone = external
        .mock("GET", "/gone")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let (storage, _dir) = test_storage().await;
    let controller = CrawlController::new();
    let outcome = run_crawl(&storage, &controller, &base, "crawl-e2e", CrawlConfig::default())
        .await
        .expect("crawl should finalize");

    private.assert_async().await;
    gone.assert_async().await;

    assert_eq!(outcome.status, CrawlStatus::Finished);
    assert_eq!(outcome.total_urls, 4);
    let metrics = &outcome.summary.metrics;
    assert_eq!(metrics.urls, 4);
    assert_eq!(metrics.broken_links, 1);
    assert_eq!(metrics.redirects, 1);
    assert_eq!(metrics.missing_h1_pct, 25.0);
    assert_eq!(metrics.duplicates_titles, 1);
    assert_eq!(metrics.duplicates_meta, 0);
    assert_eq!(metrics.images, 4);
    assert_eq!(metrics.structured_data, 4);

    // Visited pages, in BFS order. The robots-barred page never appears.
    let urls = storage
        .export_rows("crawl-e2e", Dataset::Urls)
        .await
        .expect("export urls");
    assert_eq!(urls.len(), 5);
    assert!(urls[1].contains(&format!("{base}/;200;0;")));
    assert!(urls[2].contains(&format!("{base}/about/;200;1;")));
    assert!(!urls.join("\n").contains("/private/page"));

    // The seed page is its own canonical; /about declares none.
    assert!(urls[1].contains(";self;"));
    assert!(urls[2].contains(";missing;"));
    // Title length classing: "Tiny Shop" is under the short threshold.
    assert!(urls[1].contains(";short;"));

    // /old and /new serve identical content, so their title collides.
    let duplicates = storage
        .export_rows("crawl-e2e", Dataset::DuplicatesTitles)
        .await
        .expect("export duplicate titles");
    assert_eq!(duplicates.len(), 2);
    assert!(duplicates[1].contains("moved page"));
    assert!(duplicates[1].contains(";2;"));

    let redirects = storage
        .export_rows("crawl-e2e", Dataset::Redirects)
        .await
        .expect("export redirects");
    assert_eq!(redirects.len(), 2);
    assert!(redirects[1].contains(&format!("{base}/old;{base}/new")));
    assert!(redirects[1].contains(";301;1;0"));

    let broken = storage
        .export_rows("crawl-e2e", Dataset::BrokenLinks)
        .await
        .expect("export broken links");
    assert_eq!(broken.len(), 2);
    assert!(broken[1].contains(";external;"));
    assert!(broken[1].contains(";404;"));
    assert!(broken[1].contains("Partner"));

    let images = storage
        .export_rows("crawl-e2e", Dataset::Images)
        .await
        .expect("export images");
    // Seed page: two images, one legacy, one modern.
    assert!(images[1].contains(&format!("{base}/;2;1;1")));

    let structured = storage
        .export_rows("crawl-e2e", Dataset::StructuredData)
        .await
        .expect("export structured data");
    assert!(structured[1].starts_with(&format!("crawl-e2e;{base}/;1;")));

    // The summary is queryable as the latest finished crawl for the domain.
    let latest = storage
        .latest_crawl(&base)
        .await
        .expect("query latest")
        .expect("latest crawl present");
    assert_eq!(latest.crawl_id, "crawl-e2e");
    assert_eq!(latest.summary_metrics.urls, 4);
}

#[tokio::test]
async fn test_stop_before_first_visit_finalizes_empty() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(404)
        .create_async()
        .await;

    let (storage, _dir) = test_storage().await;
    let controller = CrawlController::new();
    controller.stop("crawl-stopped");

    let outcome = run_crawl(
        &storage,
        &controller,
        &server.url(),
        "crawl-stopped",
        CrawlConfig::default(),
    )
    .await
    .expect("stopped crawl still finalizes");

    assert_eq!(outcome.status, CrawlStatus::Stopped);
    assert_eq!(outcome.total_urls, 0);
    // Stopped runs are excluded from the latest finished lookup.
    assert!(storage
        .latest_crawl(&server.url())
        .await
        .expect("query latest")
        .is_none());
    // Progress reads as done once finalized.
    let progress = controller.progress("crawl-stopped").expect("progress");
    assert!(progress.finished);
    assert_eq!(progress.progress_0_100, 100);
}

const STOP_PAGE: &str = "<html><head><title>Landing</title></head>\
     <body><h1>Hi</h1><a href=\"/about\">About</a></body></html>";

#[tokio::test]
async fn test_stop_mid_crawl_keeps_rows_gathered_so_far() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(404)
        .create_async()
        .await;

    let controller = CrawlController::new();
    // The stop request lands while the first page is being served, so the
    // traversal observes it before popping the second URL.
    let stopper = controller.clone();
    server
        .mock("GET", "/")
        .with_status(200)
        .with_body_from_request(move |_| {
            stopper.stop("crawl-midstop");
            STOP_PAGE.as_bytes().to_vec()
        })
        .expect(1)
        .create_async()
        .await;
    // The seed's outgoing link is still probed; its page is never fetched.
    let about = server
        .mock("GET", "/about")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let (storage, _dir) = test_storage().await;
    let outcome = run_crawl(
        &storage,
        &controller,
        &server.url(),
        "crawl-midstop",
        CrawlConfig::default(),
    )
    .await
    .expect("stopped crawl still finalizes");

    about.assert_async().await;
    assert_eq!(outcome.status, CrawlStatus::Stopped);
    assert_eq!(outcome.total_urls, 1);

    // The page visited before the stop is persisted under a stopped summary.
    let urls = storage
        .export_rows("crawl-midstop", Dataset::Urls)
        .await
        .expect("export urls");
    assert_eq!(urls.len(), 2);
    assert!(urls[1].contains(&format!("{}/;200;0;", server.url())));
    assert!(storage
        .latest_crawl(&server.url())
        .await
        .expect("query latest")
        .is_none());
}

#[tokio::test]
async fn test_depth_bound_stops_enqueueing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_body("<html><body><h1>Root</h1><a href=\"/about\">About</a></body></html>")
        .expect(1)
        .create_async()
        .await;
    // Probed as a link, but never fetched as a page at depth 1.
    let about = server
        .mock("GET", "/about")
        .with_status(200)
        .with_body(ABOUT_PAGE)
        .expect(1)
        .create_async()
        .await;

    let (storage, _dir) = test_storage().await;
    let controller = CrawlController::new();
    let config = CrawlConfig {
        max_depth: 0,
        ..CrawlConfig::default()
    };
    let outcome = run_crawl(&storage, &controller, &server.url(), "crawl-shallow", config)
        .await
        .expect("crawl should finalize");

    about.assert_async().await;
    assert_eq!(outcome.status, CrawlStatus::Finished);
    assert_eq!(outcome.total_urls, 1);
}

#[tokio::test]
async fn test_url_cap_bounds_the_visit_count() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/robots.txt")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/")
        .with_status(200)
        .with_body(
            "<html><body><h1>Root</h1>\
             <a href=\"/a\">A</a><a href=\"/b\">B</a><a href=\"/c\">C</a>\
             </body></html>",
        )
        .create_async()
        .await;
    for path in ["/a", "/b", "/c"] {
        server
            .mock("GET", path)
            .with_status(200)
            .with_body("<html><body><h1>Leaf</h1></body></html>")
            .create_async()
            .await;
    }

    let (storage, _dir) = test_storage().await;
    let controller = CrawlController::new();
    let config = CrawlConfig {
        max_urls: 2,
        ..CrawlConfig::default()
    };
    let outcome = run_crawl(&storage, &controller, &server.url(), "crawl-capped", config)
        .await
        .expect("crawl should finalize");

    assert_eq!(outcome.status, CrawlStatus::Finished);
    assert_eq!(outcome.total_urls, 2);
}
