//! Turn bare URLs in sanitized note text into anchors.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::SanitizeError;
use crate::sanitize::compiled;

/// Characters never kept at the end of a detected URL.
pub const TRAILING_TRIM: &str = "`!()[]{};:'\".,<>?«»“”‘’";

// Existing anchor spans and other tags are matched first and copied through
// untouched, so only URLs in text content are wrapped.
const LINK_PATTERN: &str = r#"(?P<anchor>(?is:<a\b.*?</a>))|(?P<tag><[^>]*>)|(?P<url>https?://[^\s<>]*[^\s`!()\[\]{};:'".,<>?«»“”‘’])"#;

/// Escaped angle brackets left by the sanitizer; a URL never runs into them.
const ESCAPED_BRACKETS: [&str; 2] = ["&lt;", "&gt;"];

/// Wrap every bare `http(s)://` URL outside an anchor in `<a href="URL">URL</a>`.
pub fn link_urls(input: &str) -> Result<String, SanitizeError> {
    let re = link_regex()?;
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;

    while let Some(caps) = re.captures_at(input, pos) {
        let Some(whole) = caps.get(0) else {
            break;
        };
        out.push_str(&input[pos..whole.start()]);
        let Some(url) = caps.name("url") else {
            out.push_str(whole.as_str());
            pos = whole.end();
            continue;
        };

        let candidate = cut_at_escaped_bracket(&input[url.start()..], url.len());
        let linked = candidate.trim_end_matches(|c: char| TRAILING_TRIM.contains(c));
        if has_host(linked) {
            out.push_str(&format!(
                "<a href=\"{}\">{linked}</a>",
                linked.replace('"', "&quot;")
            ));
            pos = url.start() + linked.len();
        } else {
            out.push_str(url.as_str());
            pos = url.end();
        }
    }
    out.push_str(&input[pos..]);
    Ok(out)
}

// `rest` starts at the URL; `len` is the regex match length.
fn cut_at_escaped_bracket(rest: &str, len: usize) -> &str {
    let cut = ESCAPED_BRACKETS
        .iter()
        .filter_map(|entity| rest.find(entity))
        .filter(|at| *at < len)
        .min()
        .unwrap_or(len);
    &rest[..cut]
}

fn has_host(url: &str) -> bool {
    url.split_once("://")
        .map(|(_, rest)| !rest.is_empty())
        .unwrap_or(false)
}

fn link_regex() -> Result<&'static Regex, SanitizeError> {
    static RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    compiled(&RE, "link", LINK_PATTERN)
}
