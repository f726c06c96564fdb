use crate::args::{self, CommandArgs};
use crate::{note_failure, open_store, CommandOutput, NotesBackend};

const NOTE_FLAGS: &[&str] = &["--text", "--icon", "--user"];

pub fn run_add_for_test(args: &[&str], backend: &dyn NotesBackend) -> CommandOutput {
    let parsed = match args::parse(args, NOTE_FLAGS) {
        Ok(parsed) => parsed,
        Err(out) => return out,
    };
    if parsed.help {
        return CommandOutput::ok(format!("{ADD_HELP_TEXT}\n"));
    }
    let plugin = match args::expect_positionals(&parsed, &["plugin"]) {
        Ok(values) => values[0].as_str(),
        Err(out) => return out,
    };
    let (text, icon, user) = match note_fields(&parsed, backend) {
        Ok(fields) => fields,
        Err(out) => return out,
    };

    let store = match open_store(backend, plugin) {
        Ok(store) => store,
        Err(err) => return note_failure("add note", &err),
    };
    match store.add_note(text, icon, &user) {
        Ok(index) => CommandOutput::ok(format!("{index}\n")),
        Err(err) => note_failure("add note", &err),
    }
}

pub fn run_edit_for_test(args: &[&str], backend: &dyn NotesBackend) -> CommandOutput {
    let parsed = match args::parse(args, NOTE_FLAGS) {
        Ok(parsed) => parsed,
        Err(out) => return out,
    };
    if parsed.help {
        return CommandOutput::ok(format!("{EDIT_HELP_TEXT}\n"));
    }
    let (plugin, index) = match args::expect_positionals(&parsed, &["plugin", "index"]) {
        Ok(values) => (values[0].as_str(), values[1].as_str()),
        Err(out) => return out,
    };
    let (text, icon, user) = match note_fields(&parsed, backend) {
        Ok(fields) => fields,
        Err(out) => return out,
    };

    let store = match open_store(backend, plugin) {
        Ok(store) => store,
        Err(err) => return note_failure("edit note", &err),
    };
    match store.edit(text, icon, index, &user) {
        Ok(index) => CommandOutput::ok(format!("{index}\n")),
        Err(err) => note_failure("edit note", &err),
    }
}

fn note_fields<'a>(
    parsed: &'a CommandArgs,
    backend: &dyn NotesBackend,
) -> Result<(&'a str, &'a str, String), CommandOutput> {
    let text = match parsed.text.as_deref() {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(CommandOutput::usage("--text is required")),
    };
    let icon = parsed.icon.as_deref().unwrap_or("");
    let user = match parsed.user.as_deref().map(str::trim) {
        Some(user) if !user.is_empty() => user.to_string(),
        _ => backend.default_user(),
    };
    Ok((text, icon, user))
}

const ADD_HELP_TEXT: &str = "\
Add a note to a plugin, creating its collection when needed

Prints the new note index.

Usage:
  plugin-notes add <plugin> --text TEXT [flags]

Flags:
  -h, --help          help for add
      --icon string   Icon name shown next to the note
      --text string   Note text (HTML allowed, sanitized)
      --user string   Author (default: current user)";

const EDIT_HELP_TEXT: &str = "\
Replace the text, icon and author of an existing note

The index and creation time are kept.

Usage:
  plugin-notes edit <plugin> <index> --text TEXT [flags]

Flags:
  -h, --help          help for edit
      --icon string   Icon name shown next to the note
      --text string   Note text (HTML allowed, sanitized)
      --user string   Author (default: current user)";
