use std::io::Write;

use chrono::{TimeZone, Utc};
use serde::Serialize;
use tabwriter::TabWriter;

use crate::args;
use crate::{note_failure, open_store, CommandOutput, NotesBackend};

#[derive(Debug, Serialize)]
struct ListedNote {
    index: String,
    icon: String,
    user: String,
    time: i64,
    text: String,
}

pub fn run_list_for_test(args: &[&str], backend: &dyn NotesBackend) -> CommandOutput {
    let parsed = match args::parse(args, &["--json"]) {
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
        Err(err) => return note_failure("list notes", &err),
    };
    let notes = match store.notes() {
        Ok(notes) => notes,
        Err(err) => return note_failure("list notes", &err),
    };

    let mut listed = Vec::with_capacity(notes.len());
    for (index, note) in notes {
        let text = match store.render_note(&note.text) {
            Ok(text) => text,
            Err(err) => return note_failure("list notes", &err),
        };
        listed.push(ListedNote {
            index: index.to_string(),
            icon: note.icon,
            user: note.user,
            time: note.time,
            text,
        });
    }

    if parsed.json {
        return match serde_json::to_string_pretty(&listed) {
            Ok(payload) => CommandOutput::ok(format!("{payload}\n")),
            Err(err) => CommandOutput::failure(format!("encode notes: {err}")),
        };
    }
    if listed.is_empty() {
        return CommandOutput::ok(format!("No notes for {plugin}\n"));
    }
    CommandOutput::ok(format_note_table(&listed))
}

fn format_note_table(notes: &[ListedNote]) -> String {
    let mut tw = TabWriter::new(Vec::new()).padding(2);
    let _ = writeln!(&mut tw, "INDEX\tICON\tUSER\tTIME\tTEXT");
    for note in notes {
        let _ = writeln!(
            &mut tw,
            "{}\t{}\t{}\t{}\t{}",
            note.index,
            or_dash(&note.icon),
            or_dash(&note.user),
            format_time(note.time),
            single_line(&note.text),
        );
    }
    let bytes = tabwriter_into_bytes(tw);
    String::from_utf8_lossy(&bytes).into_owned()
}

fn tabwriter_into_bytes(mut tw: TabWriter<Vec<u8>>) -> Vec<u8> {
    loop {
        match tw.into_inner() {
            Ok(v) => return v,
            Err(e) => tw = e.into_inner(),
        }
    }
}

pub(crate) fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// `YYYY-MM-DD HH:MM:SS` in UTC; `-` for unrepresentable times.
pub(crate) fn format_time(time: i64) -> String {
    match Utc.timestamp_opt(time, 0).single() {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

const HELP_TEXT: &str = "\
List the notes of a plugin, oldest first

Usage:
  plugin-notes list <plugin> [flags]

Aliases:
  list, ls

Flags:
  -h, --help   help for list
      --json   Output as JSON";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_is_formatted_in_utc() {
        assert_eq!(format_time(1_700_000_000), "2023-11-14 22:13:20");
        assert_eq!(format_time(0), "1970-01-01 00:00:00");
    }

    #[test]
    fn table_text_is_kept_on_one_line() {
        assert_eq!(single_line("a\n b\tc"), "a b c");
        assert_eq!(or_dash(" "), "-");
        assert_eq!(or_dash("info"), "info");
    }
}
