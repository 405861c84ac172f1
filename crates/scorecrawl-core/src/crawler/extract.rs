//! Candidate URL extraction from post bodies.
//!
//! Posts link their bundles as markdown links, raw HTML anchors (older
//! posts), or bare URLs on their own line. Everything found is validated
//! as an absolute http(s) URL and deduplicated in body order.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]\(([^)\s]+)\)").expect("markdown link regex"));

static HTML_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a href="([^"]+)">"#).expect("html anchor regex"));

static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s<>()\[\]]+").expect("bare url regex"));

fn is_valid(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some(),
        Err(_) => false,
    }
}

/// Extracts validated candidate URLs from a post body, in order of
/// appearance, without duplicates.
///
/// Order matters: the position of a link in the body becomes its link
/// index, which keys the resume ledger across runs.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = Vec::new();
    for caps in MARKDOWN_LINK.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            found.push((m.start(), m.as_str()));
        }
    }
    for caps in HTML_ANCHOR.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            found.push((m.start(), m.as_str()));
        }
    }
    for m in BARE_URL.find_iter(text) {
        found.push((m.start(), m.as_str()));
    }
    found.sort_by_key(|&(pos, _)| pos);

    let mut out: Vec<String> = Vec::new();
    for (_, candidate) in found {
        let candidate = candidate.trim_end_matches(['.', ',', ';']);
        if is_valid(candidate) && !out.iter().any(|u| u == candidate) {
            out.push(candidate.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_links() {
        let urls = extract_urls("grab it [here](https://we.tl/t-abc123)!");
        assert_eq!(urls, vec!["https://we.tl/t-abc123"]);
    }

    #[test]
    fn html_anchors() {
        let urls = extract_urls(r#"see <a href="https://dropbox.com/s/x">link</a>"#);
        assert_eq!(urls, vec!["https://dropbox.com/s/x"]);
    }

    #[test]
    fn bare_urls_and_trailing_punctuation() {
        let urls = extract_urls("mirror: https://example.com/score.pdf.");
        assert_eq!(urls, vec!["https://example.com/score.pdf"]);
    }

    #[test]
    fn mixed_link_styles_come_out_in_body_order() {
        let urls = extract_urls(
            "mirror https://bare.com/first then [main](https://md.com/second) \
             and <a href=\"https://html.com/third\">alt</a>",
        );
        assert_eq!(
            urls,
            vec![
                "https://bare.com/first",
                "https://md.com/second",
                "https://html.com/third",
            ]
        );
    }

    #[test]
    fn deduplicates_preserving_order() {
        let urls = extract_urls(
            "[a](https://a.com/1) then [b](https://b.com/2) and again https://a.com/1",
        );
        assert_eq!(urls, vec!["https://a.com/1", "https://b.com/2"]);
    }

    #[test]
    fn rejects_non_http_and_garbage() {
        let urls = extract_urls("[x](ftp://a.com/f) [y](notaurl) plain text");
        assert!(urls.is_empty());
    }
}
