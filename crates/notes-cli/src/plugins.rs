use crate::args;
use crate::{CommandOutput, NotesBackend};

pub fn run_plugins_for_test(args: &[&str], backend: &dyn NotesBackend) -> CommandOutput {
    let parsed = match args::parse(args, &["--prefix", "--json"]) {
        Ok(parsed) => parsed,
        Err(out) => return out,
    };
    if parsed.help {
        return CommandOutput::ok(format!("{HELP_TEXT}\n"));
    }
    if let Some(extra) = parsed.positionals.first() {
        return CommandOutput::usage(format!("unexpected argument: {extra}"));
    }

    let prefix = parsed.prefix.as_deref().unwrap_or("");
    let plugins = match backend.list_plugins(prefix) {
        Ok(plugins) => plugins,
        Err(err) => return CommandOutput::failure(format!("list plugins: {err}")),
    };

    if parsed.json {
        return match serde_json::to_string_pretty(&plugins) {
            Ok(payload) => CommandOutput::ok(format!("{payload}\n")),
            Err(err) => CommandOutput::failure(format!("encode plugins: {err}")),
        };
    }
    let mut out = String::new();
    for plugin in plugins {
        out.push_str(&plugin);
        out.push('\n');
    }
    CommandOutput::ok(out)
}

const HELP_TEXT: &str = "\
List plugins with stored notes

Usage:
  plugin-notes plugins [flags]

Flags:
  -h, --help            help for plugins
      --json            Output as JSON
      --prefix string   Only plugins whose id starts with this prefix";
