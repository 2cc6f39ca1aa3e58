use std::sync::OnceLock;

use regex::Regex;

fn script_style_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)>")
            .expect("script/style regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("tag regex"))
}

fn h1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1>").expect("h1 regex"))
}

fn nav_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<nav\b[^>]*>(.*?)</nav>").expect("nav regex"))
}

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<a\b[^>]*>(.*?)</a>").expect("anchor regex"))
}

/// Visible text of an HTML document: scripts, styles and markup removed,
/// entities decoded, whitespace collapsed.
pub fn visible_text(html: &str) -> String {
    let without_blocks = script_style_re().replace_all(html, " ");
    let without_tags = tag_re().replace_all(&without_blocks, " ");
    collapse_whitespace(&decode_entities(&without_tags))
}

/// First `<h1>` text, when present.
pub fn extract_top_heading(html: &str) -> Option<String> {
    h1_re().captures(html).map(|captures| {
        let inner = tag_re().replace_all(&captures[1], " ");
        collapse_whitespace(&decode_entities(&inner))
    })
}

/// Anchor labels inside `<nav>` blocks, in document order.
pub fn extract_navigation_labels(html: &str) -> Vec<String> {
    let mut labels = Vec::new();
    for nav in nav_re().captures_iter(html) {
        for anchor in anchor_re().captures_iter(&nav[1]) {
            let inner = tag_re().replace_all(&anchor[1], " ");
            let label = collapse_whitespace(&decode_entities(&inner));
            if !label.is_empty() {
                labels.push(label);
            }
        }
    }
    labels
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
