use serde::Serialize;

use crate::args;
use crate::{note_failure, open_store, CommandOutput, NotesBackend};

#[derive(Debug, Serialize)]
struct ShownNote<'a> {
    index: &'a str,
    icon: &'a str,
    user: &'a str,
    time: i64,
    text: &'a str,
}

pub fn run_show_for_test(args: &[&str], backend: &dyn NotesBackend) -> CommandOutput {
    let parsed = match args::parse(args, &["--json"]) {
        Ok(parsed) => parsed,
        Err(out) => return out,
    };
    if parsed.help {
        return CommandOutput::ok(format!("{HELP_TEXT}\n"));
    }
    let (plugin, index) = match args::expect_positionals(&parsed, &["plugin", "index"]) {
        Ok(values) => (values[0].as_str(), values[1].as_str()),
        Err(out) => return out,
    };

    let store = match open_store(backend, plugin) {
        Ok(store) => store,
        Err(err) => return note_failure("show note", &err),
    };
    let view = match store.get_note(index) {
        Ok(view) => view,
        Err(err) => return note_failure("show note", &err),
    };
    let record = match store.notes() {
        Ok(notes) => notes.get(index).cloned(),
        Err(err) => return note_failure("show note", &err),
    };
    let (user, time) = record
        .map(|note| (note.user, note.time))
        .unwrap_or_default();

    if parsed.json {
        let shown = ShownNote {
            index,
            icon: &view.icon,
            user: &user,
            time,
            text: &view.text,
        };
        return match serde_json::to_string_pretty(&shown) {
            Ok(payload) => CommandOutput::ok(format!("{payload}\n")),
            Err(err) => CommandOutput::failure(format!("encode note: {err}")),
        };
    }

    let mut out = String::new();
    out.push_str(&format!("Index: {index}\n"));
    out.push_str(&format!("Icon:  {}\n", crate::list::or_dash(&view.icon)));
    out.push_str(&format!("User:  {}\n", crate::list::or_dash(&user)));
    out.push_str(&format!("Time:  {}\n", crate::list::format_time(time)));
    out.push('\n');
    out.push_str(&view.text);
    out.push('\n');
    CommandOutput::ok(out)
}

const HELP_TEXT: &str = "\
Show one note

Usage:
  plugin-notes show <plugin> <index> [flags]

Flags:
  -h, --help   help for show
      --json   Output as JSON";
