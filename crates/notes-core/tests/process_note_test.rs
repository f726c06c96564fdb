#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Sanitize-and-linkify behavior over a corpus of hostile and ordinary inputs.

use notes_core::allowed_html::AllowedHtml;
use notes_core::sanitize::{process_note, render_note, AllowListSanitizer, SlashEscaped};

fn process(text: &str) -> String {
    process_note(&AllowListSanitizer, &AllowedHtml::default(), text).unwrap()
}

const HOSTILE: &[&str] = &[
    "<script>alert(1)</script>",
    "<SCRIPT SRC=//evil.test/x.js></SCRIPT>",
    "<img src=x onerror=alert(1)>",
    "<iframe src=\"https://evil.test\"></iframe>",
    "<div><span style=\"x\">nested</span></div>",
    "<a href=\"javascript:alert(1)\" onmouseover=\"x()\">click</a>",
    "<p onclick=\"x()\">para</p>",
    "<b><i>unclosed",
    "<style>body{}</style>text",
    "<svg/onload=alert(1)>",
    "<a href=\"https://ok.test\" style=\"color:red\">ok</a>",
];

const DISALLOWED_TAGS: &[&str] = &["<script", "<img", "<iframe", "<div", "<span", "<style", "<svg"];
const DISALLOWED_ATTRS: &[&str] = &["onerror", "onclick", "onmouseover", "onload", "style=", "javascript:"];

#[test]
fn disallowed_tags_and_attributes_never_survive() {
    for input in HOSTILE {
        let out = process(input).to_ascii_lowercase();
        for tag in DISALLOWED_TAGS {
            assert!(!out.contains(tag), "input={input:?} out={out:?}");
        }
        for attr in DISALLOWED_ATTRS {
            assert!(!out.contains(attr), "input={input:?} out={out:?}");
        }
    }
}

#[test]
fn unclosed_tags_are_balanced() {
    assert_eq!(process("<b><i>unclosed"), "<b><i>unclosed</i></b>");
}

#[test]
fn bare_urls_are_wrapped_once() {
    let out = process("docs: https://example.com/docs, and http://b.test/x?y=1.");
    assert_eq!(
        out,
        "docs: <a href=\"https://example.com/docs\">https://example.com/docs</a>, and \
         <a href=\"http://b.test/x?y=1\">http://b.test/x?y=1</a>."
    );
    assert_eq!(out.matches("<a ").count(), 2);
}

#[test]
fn anchored_urls_are_not_nested() {
    let input = "<a href=\"https://example.com\" title=\"Example\">https://example.com</a>";
    assert_eq!(process(input), input);

    let mixed = "<a href=\"https://a.test\">a</a> then https://b.test";
    assert_eq!(
        process(mixed),
        "<a href=\"https://a.test\">a</a> then <a href=\"https://b.test\">https://b.test</a>"
    );
}

#[test]
fn escaped_quotes_are_unslashed_for_escaping_sanitizers() {
    let sanitizer = SlashEscaped(AllowListSanitizer);
    let allowed = AllowedHtml::default();
    let stored = process_note(&sanitizer, &allowed, r#"it\'s \"fine\""#).unwrap();
    assert_eq!(stored, "it's \"fine\"");
    assert_eq!(render_note(&sanitizer, &allowed, &stored).unwrap(), stored);
}

#[test]
fn backslashes_survive_repeated_processing() {
    let input = r"C:\\Users\\me and a\b";
    let once = process(input);
    assert_eq!(once, input);
    assert_eq!(process(&once), once);
}

#[test]
fn stray_angle_bracket_after_url_is_not_linked() {
    assert_eq!(
        process("see https://example.com> now"),
        "see <a href=\"https://example.com\">https://example.com</a>&gt; now"
    );
    let once = process("1 < https://x.test> 2");
    assert_eq!(
        once,
        "1 &lt; <a href=\"https://x.test\">https://x.test</a>&gt; 2"
    );
    assert_eq!(process(&once), once);
}

#[test]
fn processing_is_idempotent_once_linked() {
    let corpus = [
        "plain text",
        "<b>bold</b> and <em>em</em>",
        "Check https://example.com now",
        "<p>one</p><p>two<br />three</p><hr />",
        "<a href=\"https://x.test\" target=\"_blank\">x</a>",
        "1 < 2 > 0",
        "<b><i>crossed</b></i>",
        "(see https://example.com/path).",
        r"path C:\tmp\x and https://x.test/a",
        "https://x.test> trailing",
    ];
    for input in corpus {
        let once = process(input);
        let twice = process(&once);
        assert_eq!(once, twice, "input={input:?}");
    }
}

#[test]
fn hostile_inputs_reach_a_fixed_point() {
    for input in HOSTILE {
        let once = process(input);
        assert_eq!(process(&once), once, "input={input:?}");
    }
}
