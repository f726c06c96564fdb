use crate::args;
use crate::{note_failure, open_store, CommandOutput, NotesBackend};

pub fn run_rm_for_test(args: &[&str], backend: &dyn NotesBackend) -> CommandOutput {
    let parsed = match args::parse(args, &[]) {
        Ok(parsed) => parsed,
        Err(out) => return out,
    };
    if parsed.help {
        return CommandOutput::ok(format!("{RM_HELP_TEXT}\n"));
    }
    let (plugin, index) = match args::expect_positionals(&parsed, &["plugin", "index"]) {
        Ok(values) => (values[0].as_str(), values[1].as_str()),
        Err(out) => return out,
    };

    let store = match open_store(backend, plugin) {
        Ok(store) => store,
        Err(err) => return note_failure("delete note", &err),
    };
    match store.delete(index) {
        Ok(true) => CommandOutput::ok(format!("Deleted note {index}\n")),
        Ok(false) => CommandOutput::failure(format!("note {index} not found for {plugin}")),
        Err(err) => note_failure("delete note", &err),
    }
}

pub fn run_purge_for_test(args: &[&str], backend: &dyn NotesBackend) -> CommandOutput {
    let parsed = match args::parse(args, &[]) {
        Ok(parsed) => parsed,
        Err(out) => return out,
    };
    if parsed.help {
        return CommandOutput::ok(format!("{PURGE_HELP_TEXT}\n"));
    }
    let plugin = match args::expect_positionals(&parsed, &["plugin"]) {
        Ok(values) => values[0].as_str(),
        Err(out) => return out,
    };

    let store = match open_store(backend, plugin) {
        Ok(store) => store,
        Err(err) => return note_failure("purge notes", &err),
    };
    match store.purge() {
        Ok(true) => CommandOutput::ok(format!("Purged notes for {plugin}\n")),
        Ok(false) => CommandOutput::failure(format!("no notes stored for {plugin}")),
        Err(err) => note_failure("purge notes", &err),
    }
}

const RM_HELP_TEXT: &str = "\
Delete one note

Deleting the last note removes the plugin's collection.

Usage:
  plugin-notes rm <plugin> <index> [flags]

Aliases:
  rm, delete

Flags:
  -h, --help   help for rm";

const PURGE_HELP_TEXT: &str = "\
Delete every note of a plugin

Usage:
  plugin-notes purge <plugin> [flags]

Flags:
  -h, --help   help for purge";
