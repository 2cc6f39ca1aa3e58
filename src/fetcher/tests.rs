use std::time::Duration;

use tempfile::TempDir;

use super::extract::{extract_navigation_labels, extract_top_heading, visible_text};
use super::*;

const SAMPLE_HTML: &str = r#"
<html>
  <head>
    <title>Acme</title>
    <style>body { color: red; }</style>
    <script>var tracked = true;</script>
  </head>
  <body>
    <nav>
      <a href="/">Home</a>
      <a href="/services/">Services &amp; Solutions</a>
      <a href="/about-us"><span>About</span> Us</a>
    </nav>
    <h1>Engineering a better tomorrow</h1>
    <p>We deliver infrastructure programmes across EMEA.</p>
  </body>
</html>
"#;

fn test_fetcher(dir: &TempDir) -> Fetcher {
    Fetcher::new(
        dir.path(),
        vec!["Engineering a better tomorrow".to_string()],
        Duration::from_secs(5),
    )
}

#[test]
fn visible_text_strips_markup_scripts_and_styles() {
    let text = visible_text(SAMPLE_HTML);
    assert!(text.contains("We deliver infrastructure programmes across EMEA."));
    assert!(!text.contains("color: red"));
    assert!(!text.contains("var tracked"));
    assert!(!text.contains('<'));
}

#[test]
fn top_heading_and_nav_labels_are_extracted() {
    assert_eq!(
        extract_top_heading(SAMPLE_HTML).as_deref(),
        Some("Engineering a better tomorrow")
    );
    assert_eq!(
        extract_navigation_labels(SAMPLE_HTML),
        vec!["Home", "Services & Solutions", "About Us"]
    );
}

#[test]
fn page_from_html_computes_objective_signals() {
    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(&dir);
    let page = fetcher.page_from_html("https://acme.example/", SAMPLE_HTML);

    assert!(!page.is_404);
    assert_eq!(page.objective_findings["tagline_present"], "true");
    assert_eq!(page.objective_findings["placeholder_text_present"], "false");
    assert_eq!(
        page.objective_findings["top_heading"],
        "Engineering a better tomorrow"
    );
    assert!(page.objective_findings["navigation_labels"].contains("Services & Solutions"));
}

#[test]
fn placeholder_copy_is_detected() {
    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(&dir);
    let page = fetcher.page_from_html(
        "https://acme.example/draft",
        "<body><p>Lorem ipsum dolor sit amet.</p></body>",
    );
    assert_eq!(page.objective_findings["placeholder_text_present"], "true");
}

#[test]
fn cache_round_trips_page_data() {
    let dir = TempDir::new().unwrap();
    let cache = PageCache::new(dir.path());
    let url = "https://acme.example/services/cloud";

    assert!(cache.load(url).is_none());

    let fetcher = test_fetcher(&dir);
    let page = fetcher.page_from_html(url, SAMPLE_HTML);
    cache.store(url, &page).unwrap();

    let loaded = cache.load(url).expect("cache entry present");
    assert_eq!(loaded.url, page.url);
    assert_eq!(loaded.raw_text, page.raw_text);
    assert_eq!(loaded.objective_findings, page.objective_findings);
}

#[test]
fn cache_keys_distinguish_urls_with_identical_slugs() {
    let dir = TempDir::new().unwrap();
    let cache = PageCache::new(dir.path());
    let fetcher = test_fetcher(&dir);

    let first_url = "https://acme.example/a?x=1";
    let second_url = "https://acme.example/a#x-1";
    let first = fetcher.page_from_html(first_url, "<p>first</p>");
    let second = fetcher.page_from_html(second_url, "<p>second</p>");

    cache.store(first_url, &first).unwrap();
    cache.store(second_url, &second).unwrap();

    assert!(cache.load(first_url).unwrap().raw_text.contains("first"));
    assert!(cache.load(second_url).unwrap().raw_text.contains("second"));
}

#[tokio::test]
async fn fetch_failure_is_reported_as_not_found_and_not_persisted() {
    let dir = TempDir::new().unwrap();
    let fetcher = test_fetcher(&dir);

    // Reserved TLD: resolution fails without touching a real host.
    let page = fetcher.fetch("https://unreachable.invalid/page").await;
    assert!(page.is_404);
    assert!(page.raw_text.is_empty());

    // Failure memoized in-process, so the retry performs no second call...
    let again = fetcher.fetch("https://unreachable.invalid/page").await;
    assert!(again.is_404);
    let (hits, misses) = fetcher.cache_stats();
    assert_eq!(misses, 1);
    assert_eq!(hits, 1);

    // ...but nothing was written to the on-disk cache.
    let cache = PageCache::new(dir.path());
    assert!(cache.load("https://unreachable.invalid/page").is_none());
}
