// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! HTML signal extraction.
//!
//! [`analyze`] parses a fetched page once and pulls every audit signal out of
//! it synchronously, returning plain owned data. Nothing here performs I/O,
//! and the parsed DOM never crosses an await point, so the crawl task stays
//! `Send`. Each signal is independently fault tolerant: missing or malformed
//! markup yields that signal's default and never aborts the others.

use crate::models::records::StructuredDataRecord;
use crate::services::url_norm::{canonicalize, same_host};
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

const TITLE_MAX_CHARS: usize = 512;
const META_MAX_CHARS: usize = 1024;
const H1_MAX_CHARS: usize = 512;

/// Recursion bound for the JSON-LD walk, against pathological nesting.
const MAX_JSON_DEPTH: usize = 64;

const TITLE_SHORT: i64 = 30;
const TITLE_LONG: i64 = 65;
const META_SHORT: i64 = 70;
const META_LONG: i64 = 160;

/// Schema.org types the audit reports presence for.
const WANTED_TYPES: [&str; 8] = [
    "Product",
    "BreadcrumbList",
    "Article",
    "FAQPage",
    "WebSite",
    "Organization",
    "Offer",
    "AggregateRating",
];

/// One outbound anchor as found in the page.
#[derive(Debug, Clone)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Per-page `<img>` counts by format family.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCounts {
    pub total: i64,
    pub legacy: i64,
    pub modern: i64,
}

/// Structured-data types found on a page plus a JSON-LD parse-error counter.
#[derive(Debug, Clone, Default)]
pub struct StructuredData {
    pub types: HashSet<String>,
    pub parse_errors: i64,
}

impl StructuredData {
    /// Project the found types onto the fixed allow list.
    pub fn into_record(self, crawl_id: &str, url: &str) -> StructuredDataRecord {
        let has = |t: &str| self.types.contains(t);
        StructuredDataRecord {
            crawl_id: crawl_id.to_string(),
            url: url.to_string(),
            sd_product: has(WANTED_TYPES[0]),
            sd_breadcrumb_list: has(WANTED_TYPES[1]),
            sd_article: has(WANTED_TYPES[2]),
            sd_faq_page: has(WANTED_TYPES[3]),
            sd_web_site: has(WANTED_TYPES[4]),
            sd_organization: has(WANTED_TYPES[5]),
            sd_offer: has(WANTED_TYPES[6]),
            sd_aggregate_rating: has(WANTED_TYPES[7]),
            parse_errors: self.parse_errors,
        }
    }
}

/// Everything the crawler needs from one fetched page.
#[derive(Debug, Clone, Default)]
pub struct PageAnalysis {
    pub title: String,
    pub meta_description: String,
    pub h1_text: String,
    pub robots_meta: String,
    pub canonical_href: String,
    pub anchors: Vec<Anchor>,
    pub images: ImageCounts,
    pub structured: StructuredData,
}

/// Parse fetched HTML (empty string for a failed fetch) into audit signals.
pub fn analyze(html: &str) -> PageAnalysis {
    let document = Html::parse_document(html);
    PageAnalysis {
        title: extract_title(&document),
        meta_description: extract_meta_description(&document),
        h1_text: extract_h1(&document),
        robots_meta: extract_robots_meta(&document),
        canonical_href: extract_canonical_href(&document),
        anchors: extract_anchors(&document),
        images: extract_images(&document),
        structured: extract_structured_data(&document),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| truncate_chars(&el.text().collect::<String>(), TITLE_MAX_CHARS))
        .unwrap_or_default()
}

fn extract_meta_description(document: &Html) -> String {
    let Ok(selector) = Selector::parse("meta") else {
        return String::new();
    };
    let mut description = String::new();
    for element in document.select(&selector) {
        let name = element
            .value()
            .attr("name")
            .or_else(|| element.value().attr("property"))
            .unwrap_or_default();
        if name.eq_ignore_ascii_case("description") {
            if let Some(content) = element.value().attr("content") {
                // Last matching tag wins, as browsers and crawlers see it.
                description = truncate_chars(content, META_MAX_CHARS);
            }
        }
    }
    description
}

fn extract_h1(document: &Html) -> String {
    let Ok(selector) = Selector::parse("h1") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| truncate_chars(el.text().collect::<String>().trim(), H1_MAX_CHARS))
        .unwrap_or_default()
}

fn extract_robots_meta(document: &Html) -> String {
    let Ok(selector) = Selector::parse("meta") else {
        return String::new();
    };
    for element in document.select(&selector) {
        let name = element.value().attr("name").unwrap_or_default();
        if name.eq_ignore_ascii_case("robots") {
            return element.value().attr("content").unwrap_or_default().to_string();
        }
    }
    String::new()
}

fn extract_canonical_href(document: &Html) -> String {
    let Ok(selector) = Selector::parse(r#"link[rel="canonical"]"#) else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .unwrap_or_default()
        .to_string()
}

fn extract_anchors(document: &Html) -> Vec<Anchor> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            Some(Anchor {
                href: href.to_string(),
                text: element.text().collect::<String>().trim().to_string(),
            })
        })
        .collect()
}

fn extract_images(document: &Html) -> ImageCounts {
    let Ok(selector) = Selector::parse("img[src]") else {
        return ImageCounts::default();
    };
    let mut counts = ImageCounts::default();
    for element in document.select(&selector) {
        let src = element.value().attr("src").unwrap_or_default().to_lowercase();
        counts.total += 1;
        // Classify on the extension before any query string or fragment.
        let path = src.split(['?', '#']).next().unwrap_or_default();
        if path.ends_with(".webp") || path.ends_with(".avif") {
            counts.modern += 1;
        } else if [".jpg", ".jpeg", ".png", ".gif"]
            .iter()
            .any(|ext| path.ends_with(ext))
        {
            counts.legacy += 1;
        }
    }
    counts
}

fn extract_structured_data(document: &Html) -> StructuredData {
    let mut data = StructuredData::default();

    if let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) {
        for element in document.select(&selector) {
            let payload = element.text().collect::<String>();
            match serde_json::from_str::<Value>(&payload) {
                Ok(value) => collect_json_ld_types(&value, 0, &mut data.types),
                Err(_) => data.parse_errors += 1,
            }
        }
    }

    if let Ok(selector) = Selector::parse("[itemtype]") {
        for element in document.select(&selector) {
            let itemtype = element.value().attr("itemtype").unwrap_or_default();
            // Microdata itemtype values are URLs; the type is the last segment.
            let type_name = itemtype.rsplit('/').next().unwrap_or_default();
            if !type_name.is_empty() {
                data.types.insert(type_name.to_string());
            }
        }
    }

    data
}

/// Collect every `@type` value (string or array of strings) at any nesting
/// depth of a JSON-LD payload.
fn collect_json_ld_types(value: &Value, depth: usize, types: &mut HashSet<String>) {
    if depth > MAX_JSON_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            match map.get("@type") {
                Some(Value::String(type_name)) => {
                    types.insert(type_name.clone());
                }
                Some(Value::Array(items)) => {
                    for item in items {
                        if let Value::String(type_name) = item {
                            types.insert(type_name.clone());
                        }
                    }
                }
                _ => {}
            }
            for nested in map.values() {
                collect_json_ld_types(nested, depth + 1, types);
            }
        }
        Value::Array(items) => {
            for nested in items {
                collect_json_ld_types(nested, depth + 1, types);
            }
        }
        _ => {}
    }
}

/// Classification of a page's `<link rel="canonical">` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalStatus {
    Missing,
    SelfRef,
    Cross,
    Conflict,
}

impl CanonicalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Missing => "missing",
            CanonicalStatus::SelfRef => "self",
            CanonicalStatus::Cross => "cross",
            CanonicalStatus::Conflict => "conflict",
        }
    }
}

/// Classify a canonical href against the page's own canonical URL and the
/// crawled domain: absent tag is `missing`, pointing at the page itself is
/// `self`, another URL on the same domain is `cross`, off-domain is `conflict`.
pub fn classify_canonical(page_url: &str, canonical_href: &str, seed_url: &str) -> CanonicalStatus {
    if canonical_href.is_empty() {
        return CanonicalStatus::Missing;
    }
    let resolved = Url::parse(page_url)
        .ok()
        .and_then(|base| base.join(canonical_href).ok())
        .and_then(|resolved| canonicalize(resolved.as_str()));
    let Some(resolved) = resolved else {
        return CanonicalStatus::Missing;
    };
    if resolved == page_url {
        CanonicalStatus::SelfRef
    } else if same_host(&resolved, seed_url) {
        CanonicalStatus::Cross
    } else {
        CanonicalStatus::Conflict
    }
}

/// Title-length classification: 0 is missing, under 30 short, over 65 long.
pub fn classify_title_len(length: i64) -> &'static str {
    if length == 0 {
        "missing"
    } else if length < TITLE_SHORT {
        "short"
    } else if length > TITLE_LONG {
        "long"
    } else {
        "ok"
    }
}

/// Meta-description-length classification: 0 missing, under 70 short, over 160 long.
pub fn classify_meta_len(length: i64) -> &'static str {
    if length == 0 {
        "missing"
    } else if length < META_SHORT {
        "short"
    } else if length > META_LONG {
        "long"
    } else {
        "ok"
    }
}
