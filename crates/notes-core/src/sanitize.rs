//! HTML sanitizer contract, the allow-list implementation, and the
//! note-processing pipeline built on top of them.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::allowed_html::AllowedHtml;
use crate::error::SanitizeError;
use crate::linkify::link_urls;

/// URL schemes accepted in URI-valued attributes.
pub const ALLOWED_PROTOCOLS: &[&str] = &[
    "http", "https", "ftp", "ftps", "mailto", "news", "irc", "irc6", "ircs", "gopher", "nntp",
    "feed", "telnet", "mms", "rtsp", "sms", "svn", "tel", "fax", "xmpp", "webcal", "urn",
];

const URI_ATTRIBUTES: &[&str] = &["href", "src", "cite", "action", "formaction", "poster"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// HTML sanitizer provided by the host.
pub trait HtmlSanitizer {
    /// Strip tags and attributes not named in `allowed`.
    fn sanitize(&self, html: &str, allowed: &AllowedHtml) -> Result<String, SanitizeError>;

    /// Close unmatched tags and drop stray closing tags.
    fn balance_tags(&self, html: &str) -> Result<String, SanitizeError>;

    /// Reverse backslash escaping that `sanitize` introduced. Sanitizers that
    /// add none keep the default.
    fn unslash(&self, html: &str) -> String {
        html.to_string()
    }
}

/// Adapter for host sanitizers that work on backslash-escaped input and leave
/// the escaping in their output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlashEscaped<S>(pub S);

impl<S: HtmlSanitizer> HtmlSanitizer for SlashEscaped<S> {
    fn sanitize(&self, html: &str, allowed: &AllowedHtml) -> Result<String, SanitizeError> {
        self.0.sanitize(html, allowed)
    }

    fn balance_tags(&self, html: &str) -> Result<String, SanitizeError> {
        self.0.balance_tags(html)
    }

    fn unslash(&self, html: &str) -> String {
        strip_slashes(html)
    }
}

/// Regex-tokenizing allow-list sanitizer.
///
/// Comments are removed, disallowed tags are dropped (their inner text is
/// kept), disallowed attributes are dropped, URI attributes must use an
/// allowed scheme, and `<`/`>` that do not form a tag are escaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowListSanitizer;

impl HtmlSanitizer for AllowListSanitizer {
    fn sanitize(&self, html: &str, allowed: &AllowedHtml) -> Result<String, SanitizeError> {
        let token_re = token_regex()?;
        let tag_re = tag_regex()?;
        let attr_re = attribute_regex()?;
        let entity_re = entity_regex()?;

        let mut out = String::with_capacity(html.len());
        let mut last = 0;
        for token in token_re.find_iter(html) {
            out.push_str(&html[last..token.start()]);
            last = token.end();

            let raw = token.as_str();
            if raw.starts_with("<!--") {
                continue;
            }
            let Some(caps) = tag_re.captures(raw) else {
                out.push_str(&escape_angles(raw));
                continue;
            };

            let name = caps
                .get(2)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default();
            if !allowed.allows_tag(&name) {
                continue;
            }
            if caps.get(1).is_some() {
                out.push_str(&format!("</{name}>"));
                continue;
            }

            let mut rest = caps.get(3).map(|m| m.as_str()).unwrap_or_default().trim_end();
            let self_closing = rest.ends_with('/');
            if self_closing {
                rest = rest.trim_end_matches('/');
            }

            out.push('<');
            out.push_str(&name);
            let mut seen: Vec<String> = Vec::new();
            for attr in attr_re.captures_iter(rest) {
                let attr_name = attr
                    .get(1)
                    .map(|m| m.as_str().to_ascii_lowercase())
                    .unwrap_or_default();
                if seen.contains(&attr_name) || !allowed.allows_attribute(&name, &attr_name) {
                    continue;
                }
                seen.push(attr_name.clone());

                let value = attr.get(2).or(attr.get(3)).or(attr.get(4));
                match value {
                    Some(value) => {
                        let value = value.as_str();
                        if URI_ATTRIBUTES.contains(&attr_name.as_str())
                            && !has_allowed_protocol(value, entity_re)
                        {
                            continue;
                        }
                        out.push_str(&format!(" {attr_name}=\"{}\"", escape_attribute(value)));
                    }
                    None => {
                        if URI_ATTRIBUTES.contains(&attr_name.as_str()) {
                            continue;
                        }
                        out.push(' ');
                        out.push_str(&attr_name);
                    }
                }
            }
            if self_closing {
                out.push_str(" /");
            }
            out.push('>');
        }
        out.push_str(&html[last..]);
        Ok(out)
    }

    fn balance_tags(&self, html: &str) -> Result<String, SanitizeError> {
        let re = balance_regex()?;
        let mut out = String::with_capacity(html.len());
        let mut open: Vec<String> = Vec::new();
        let mut last = 0;

        for caps in re.captures_iter(html) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&html[last..whole.start()]);
            last = whole.end();

            let name = caps
                .get(2)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default();
            let closing = caps.get(1).is_some();
            let attrs = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

            if closing {
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    continue;
                }
                if let Some(pos) = open.iter().rposition(|tag| *tag == name) {
                    for tag in open.drain(pos..).rev() {
                        out.push_str(&format!("</{tag}>"));
                    }
                }
                continue;
            }

            if VOID_ELEMENTS.contains(&name.as_str()) {
                out.push_str(whole.as_str());
                continue;
            }
            let trimmed = attrs.trim_end();
            if let Some(attrs) = trimmed.strip_suffix('/') {
                let raw_name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                out.push_str(&format!("<{raw_name}{}></{name}>", attrs.trim_end()));
                continue;
            }
            out.push_str(whole.as_str());
            open.push(name);
        }
        out.push_str(&html[last..]);
        for tag in open.iter().rev() {
            out.push_str(&format!("</{tag}>"));
        }
        Ok(out)
    }
}

/// Sanitize, balance, unslash, then link bare URLs. Applied to incoming text.
pub fn process_note(
    sanitizer: &dyn HtmlSanitizer,
    allowed: &AllowedHtml,
    text: &str,
) -> Result<String, SanitizeError> {
    let sanitized = sanitizer.sanitize(text, allowed)?;
    let balanced = sanitizer.balance_tags(&sanitized)?;
    link_urls(&sanitizer.unslash(&balanced))
}

/// Re-render stored text for display: `process_note` without the unslash
/// step, so stored backslashes survive every read.
pub fn render_note(
    sanitizer: &dyn HtmlSanitizer,
    allowed: &AllowedHtml,
    stored: &str,
) -> Result<String, SanitizeError> {
    let sanitized = sanitizer.sanitize(stored, allowed)?;
    let balanced = sanitizer.balance_tags(&sanitized)?;
    link_urls(&balanced)
}

/// Undo backslash escaping: `\x` becomes `x`, `\\` becomes `\`, `\0` becomes NUL.
pub fn strip_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('\0'),
            Some(next) => out.push(next),
            None => {}
        }
    }
    out
}

fn has_allowed_protocol(value: &str, entity_re: &Regex) -> bool {
    let decoded = entity_re.replace_all(value, |caps: &Captures| decode_entity(caps));
    let compact: String = decoded
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    let Some(colon) = compact.find(':') else {
        return true;
    };
    let scheme = &compact[..colon];
    if scheme.contains(['/', '?', '#']) {
        return true;
    }
    ALLOWED_PROTOCOLS.contains(&scheme)
}

fn decode_entity(caps: &Captures) -> String {
    let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
    if let Some(named) = caps.get(1) {
        return match named.as_str().to_ascii_lowercase().as_str() {
            "colon" => ":".to_string(),
            "tab" => "\t".to_string(),
            "newline" => "\n".to_string(),
            _ => whole.to_string(),
        };
    }
    let code = match (caps.get(2), caps.get(3)) {
        (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
        (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
        _ => None,
    };
    code.and_then(char::from_u32)
        .map(String::from)
        .unwrap_or_else(|| whole.to_string())
}

fn escape_angles(raw: &str) -> String {
    raw.replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn compiled(
    slot: &'static OnceLock<Result<Regex, String>>,
    name: &'static str,
    pattern: &str,
) -> Result<&'static Regex, SanitizeError> {
    match slot.get_or_init(|| Regex::new(pattern).map_err(|err| err.to_string())) {
        Ok(re) => Ok(re),
        Err(message) => Err(SanitizeError::Pattern {
            name,
            message: message.clone(),
        }),
    }
}

fn token_regex() -> Result<&'static Regex, SanitizeError> {
    static RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    compiled(&RE, "token", r"(?s)<!--.*?(?:-->|$)|<[^>]*(?:>|$)|>")
}

fn tag_regex() -> Result<&'static Regex, SanitizeError> {
    static RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    compiled(&RE, "tag", r"(?s)^<(/)?([A-Za-z][A-Za-z0-9-]*)(.*?)>?$")
}

fn attribute_regex() -> Result<&'static Regex, SanitizeError> {
    static RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    compiled(
        &RE,
        "attribute",
        r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#,
    )
}

fn entity_regex() -> Result<&'static Regex, SanitizeError> {
    static RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    compiled(
        &RE,
        "entity",
        r"&(?:([A-Za-z]+)|#[xX]([0-9A-Fa-f]+)|#([0-9]+));?",
    )
}

fn balance_regex() -> Result<&'static Regex, SanitizeError> {
    static RE: OnceLock<Result<Regex, String>> = OnceLock::new();
    compiled(&RE, "balance", r"<(/)?([A-Za-z][A-Za-z0-9-]*)([^>]*)>")
}
