use crate::args;
use crate::{note_failure, open_store, CommandOutput, NotesBackend};

pub fn run_has_for_test(args: &[&str], backend: &dyn NotesBackend) -> CommandOutput {
    let parsed = match args::parse(args, &[]) {
        Ok(parsed) => parsed,
        Err(out) => return out,
    };
    if parsed.help {
        return CommandOutput::ok(format!("{HELP_TEXT}\n"));
    }
    let plugin = match args::expect_positionals(&parsed, &["plugin"]) {
        Ok(values) => values[0].as_str(),
        Err(out) => return out,
    };

    let store = match open_store(backend, plugin) {
        Ok(store) => store,
        Err(err) => return note_failure("has notes", &err),
    };
    match store.has_notes() {
        Ok(true) => CommandOutput::ok("yes\n"),
        Ok(false) => CommandOutput {
            stdout: "no\n".to_string(),
            stderr: String::new(),
            exit_code: 1,
        },
        Err(err) => note_failure("has notes", &err),
    }
}

const HELP_TEXT: &str = "\
Report whether a plugin has notes

Prints yes (exit 0) or no (exit 1).

Usage:
  plugin-notes has <plugin> [flags]

Flags:
  -h, --help   help for has";
