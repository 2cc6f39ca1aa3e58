mod cache;
mod extract;
#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub use cache::PageCache;
use extract::{extract_navigation_labels, extract_top_heading, visible_text};

/// Rendered page text plus objective signals, cached by URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageData {
    pub url: String,
    pub raw_text: String,
    pub is_404: bool,
    pub objective_findings: BTreeMap<String, String>,
}

impl PageData {
    pub fn not_found(url: &str) -> Self {
        Self {
            url: url.to_string(),
            raw_text: String::new(),
            is_404: true,
            objective_findings: BTreeMap::new(),
        }
    }
}

/// Read-through page fetcher. Successful fetches are persisted to the
/// on-disk cache and memoized in-process; failures are memoized only, so a
/// later run retries them.
pub struct Fetcher {
    client: Client,
    cache: PageCache,
    taglines: Vec<String>,
    memo: Mutex<BTreeMap<String, PageData>>,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
}

impl Fetcher {
    pub fn new(cache_dir: &Path, taglines: Vec<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("brandaudit/0.1")
            .build()
            .unwrap_or_default();

        Self {
            client,
            cache: PageCache::new(cache_dir),
            taglines,
            memo: Mutex::new(BTreeMap::new()),
            cache_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
        }
    }

    /// Fetch a page. Never fails: any network or decode error yields a
    /// `PageData` with `is_404` set and empty text.
    pub async fn fetch(&self, url: &str) -> PageData {
        {
            let memo = self.memo.lock().await;
            if let Some(page) = memo.get(url) {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                return page.clone();
            }
        }

        if let Some(page) = self.cache.load(url) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            let mut memo = self.memo.lock().await;
            memo.insert(url.to_string(), page.clone());
            return page;
        }

        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        let page = self.fetch_uncached(url).await;

        if !page.is_404 {
            if let Err(err) = self.cache.store(url, &page) {
                warn!(url, error = %err, "failed to persist page cache entry");
            }
        }

        let mut memo = self.memo.lock().await;
        memo.insert(url.to_string(), page.clone());
        page
    }

    async fn fetch_uncached(&self, url: &str) -> PageData {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(url, error = %err, "page fetch failed");
                return PageData::not_found(url);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "page fetch returned non-success status");
            return PageData::not_found(url);
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(err) => {
                warn!(url, error = %err, "failed to read page body");
                return PageData::not_found(url);
            }
        };

        debug!(url, bytes = html.len(), "page fetched");
        self.page_from_html(url, &html)
    }

    /// Build `PageData` from raw HTML: visible text plus objective signals.
    pub fn page_from_html(&self, url: &str, html: &str) -> PageData {
        let raw_text = visible_text(html);
        let text_lower = raw_text.to_ascii_lowercase();

        let tagline_present = self
            .taglines
            .iter()
            .any(|tagline| text_lower.contains(&tagline.to_ascii_lowercase()));
        let placeholder_present = text_lower.contains("lorem ipsum");

        let mut objective_findings = BTreeMap::new();
        objective_findings.insert("tagline_present".to_string(), tagline_present.to_string());
        objective_findings.insert(
            "placeholder_text_present".to_string(),
            placeholder_present.to_string(),
        );
        objective_findings.insert(
            "top_heading".to_string(),
            extract_top_heading(html).unwrap_or_default(),
        );
        objective_findings.insert(
            "navigation_labels".to_string(),
            extract_navigation_labels(html).join(" | "),
        );

        PageData {
            url: url.to_string(),
            raw_text,
            is_404: false,
            objective_findings,
        }
    }

    pub fn cache_stats(&self) -> (usize, usize) {
        (
            self.cache_hits.load(Ordering::Relaxed),
            self.cache_misses.load(Ordering::Relaxed),
        )
    }
}
