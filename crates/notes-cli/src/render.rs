use notes_core::sanitize::{process_note, AllowListSanitizer};

use crate::args;
use crate::{CommandOutput, NotesBackend};

pub fn run_render_for_test(args: &[&str], backend: &dyn NotesBackend) -> CommandOutput {
    let parsed = match args::parse(args, &["--text"]) {
        Ok(parsed) => parsed,
        Err(out) => return out,
    };
    if parsed.help {
        return CommandOutput::ok(format!("{HELP_TEXT}\n"));
    }
    if !parsed.positionals.is_empty() {
        return CommandOutput::usage(format!(
            "unexpected argument: {}",
            parsed.positionals[0]
        ));
    }
    let Some(text) = parsed.text.as_deref() else {
        return CommandOutput::usage("--text is required");
    };

    match process_note(&AllowListSanitizer, &backend.allowed_html(), text) {
        Ok(rendered) => CommandOutput::ok(format!("{rendered}\n")),
        Err(err) => CommandOutput::failure(format!("render: {err}")),
    }
}

const HELP_TEXT: &str = "\
Print the sanitized, linkified form of some text without storing it

Usage:
  plugin-notes render --text TEXT [flags]

Flags:
  -h, --help          help for render
      --text string   Text to render";
