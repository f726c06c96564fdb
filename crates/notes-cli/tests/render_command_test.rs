#![allow(clippy::expect_used, clippy::unwrap_used)]

use notes_cli::{run_cli_for_test, InMemoryNotesBackend};
use notes_core::allowed_html::AllowedHtml;

#[test]
fn render_sanitizes_and_links() {
    let backend = InMemoryNotesBackend::new(0, &[]);
    let out = run_cli_for_test(
        &["render", "--text", "<p onclick=\"x()\">go to https://example.com</p><script>bad()</script>"],
        &backend,
    );
    assert_eq!(out.exit_code, 0, "stderr={}", out.stderr);
    assert_eq!(
        out.stdout,
        "<p>go to <a href=\"https://example.com\">https://example.com</a></p>bad()\n"
    );
    assert!(backend.options.keys().is_empty());
}

#[test]
fn render_follows_the_backend_allow_list() {
    let backend = InMemoryNotesBackend::new(0, &[])
        .with_allowed_html(AllowedHtml::default().allow_tag("code", &[]).remove_tag("b"));
    let out = run_cli_for_test(&["render", "--text", "<code>x</code> <b>y</b>"], &backend);
    assert_eq!(out.stdout, "<code>x</code> y\n");
}

#[test]
fn render_requires_text() {
    let backend = InMemoryNotesBackend::new(0, &[]);
    let out = run_cli_for_test(&["render"], &backend);
    assert_eq!(out.exit_code, 2);

    let out = run_cli_for_test(&["render", "stray"], &backend);
    assert_eq!(out.exit_code, 2);
    assert!(out.stderr.contains("unexpected argument: stray"));
}
