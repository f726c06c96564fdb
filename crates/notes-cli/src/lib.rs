//! notes-cli: command-line interface over plugin note collections.

use std::path::PathBuf;
use std::sync::OnceLock;

use notes_core::allowed_html::AllowedHtml;
use notes_core::clock::{Clock, FixedClock, ScriptedSuffix, SuffixSource, SystemClock, ThreadRngSuffix};
use notes_core::config::Config;
use notes_core::error::StoreError;
use notes_core::event::{InMemoryEventSink, NoteEventSink, TracingEventSink};
use notes_core::option_store::{MemoryOptionStore, OptionStore};
use notes_core::{NoteError, NoteStore};
use notes_db::{Db, DbError, OptionRepository};

/// Stable crate label used by bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "notes-cli"
}

static VERSION: OnceLock<String> = OnceLock::new();

/// Set the version string for `--version` output.
pub fn set_version(version: &str) {
    let _ = VERSION.set(version.to_string());
}

fn get_version() -> &'static str {
    VERSION.get().map(|s| s.as_str()).unwrap_or("dev")
}

fn help_text() -> String {
    "\
plugin-notes keeps admin notes attached to plugins.

Usage:
  plugin-notes [--config FILE] [command]

Available Commands:
  add         Add a note (creates the collection when needed)
  edit        Replace the text, icon and author of a note
  has         Report whether a plugin has notes
  help        Help about any command
  list        List the notes of a plugin
  plugins     List plugins with stored notes
  purge       Delete every note of a plugin
  render      Print the sanitized, linkified form of some text
  rm          Delete one note
  show        Show one note

Flags:
      --config FILE   config file (default: search standard locations)
  -h, --help          help for plugin-notes
  -v, --version       version for plugin-notes

Use \"plugin-notes [command] --help\" for more information about a command.\n"
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub(crate) fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Bad invocation: exit 2.
    pub(crate) fn usage(message: impl AsRef<str>) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("{}\n", message.as_ref()),
            exit_code: 2,
        }
    }

    /// Failed operation: exit 1.
    pub(crate) fn failure(message: impl AsRef<str>) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("{}\n", message.as_ref()),
            exit_code: 1,
        }
    }
}

/// Host services the commands run against.
pub trait NotesBackend {
    fn options(&self) -> &dyn OptionStore;

    /// Stored plugin ids starting with `prefix`, sorted.
    fn list_plugins(&self, prefix: &str) -> Result<Vec<String>, String>;

    fn allowed_html(&self) -> AllowedHtml {
        AllowedHtml::default()
    }

    fn clock(&self) -> &dyn Clock {
        &SystemClock
    }

    fn suffixes(&self) -> &dyn SuffixSource {
        &ThreadRngSuffix
    }

    fn events(&self) -> &dyn NoteEventSink {
        &TracingEventSink
    }

    /// Author recorded when `--user` is not given.
    fn default_user(&self) -> String;
}

/// Build a `NoteStore` for `plugin_id` wired to `backend`.
pub fn open_store<'a>(
    backend: &'a dyn NotesBackend,
    plugin_id: &str,
) -> Result<NoteStore<'a>, NoteError> {
    let allowed = backend.allowed_html();
    Ok(NoteStore::new(plugin_id, backend.options())?
        .with_allowed_html_filter(move |_| allowed)
        .with_clock(backend.clock())
        .with_suffix_source(backend.suffixes())
        .with_event_sink(backend.events()))
}

/// SQLite-backed notes, as used by the installed binary.
pub struct SqliteNotesBackend {
    db: Db,
    allowed: AllowedHtml,
}

impl SqliteNotesBackend {
    /// Open (creating and migrating as needed) the database named by `cfg`.
    pub fn open(cfg: &Config) -> Result<Self, DbError> {
        let busy_timeout_ms = u64::try_from(cfg.database.busy_timeout_ms).unwrap_or(0);
        let db_config =
            notes_db::Config::new(cfg.database_path()).with_busy_timeout_ms(busy_timeout_ms);
        let mut db = Db::open(db_config)?;
        db.migrate_up()?;
        Ok(Self {
            db,
            allowed: (cfg.allowed_html_filter())(AllowedHtml::default()),
        })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}

impl OptionStore for SqliteNotesBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        OptionStore::get(&OptionRepository::new(&self.db), key)
    }

    fn add(&self, key: &str, value: &str) -> Result<(), StoreError> {
        OptionStore::add(&OptionRepository::new(&self.db), key, value)
    }

    fn update(&self, key: &str, value: &str) -> Result<(), StoreError> {
        OptionStore::update(&OptionRepository::new(&self.db), key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        OptionStore::delete(&OptionRepository::new(&self.db), key)
    }
}

impl NotesBackend for SqliteNotesBackend {
    fn options(&self) -> &dyn OptionStore {
        self
    }

    fn list_plugins(&self, prefix: &str) -> Result<Vec<String>, String> {
        OptionRepository::new(&self.db)
            .list_names(prefix)
            .map_err(|err| err.to_string())
    }

    fn allowed_html(&self) -> AllowedHtml {
        self.allowed.clone()
    }

    fn default_user(&self) -> String {
        std::env::var("USER")
            .ok()
            .map(|user| user.trim().to_string())
            .filter(|user| !user.is_empty())
            .unwrap_or_else(|| "cli".to_string())
    }
}

/// Deterministic in-memory backend: fixed clock, scripted suffixes and a
/// recording event sink.
pub struct InMemoryNotesBackend {
    pub options: MemoryOptionStore,
    pub clock: FixedClock,
    pub suffixes: ScriptedSuffix,
    pub events: InMemoryEventSink,
    pub allowed: AllowedHtml,
    pub user: String,
}

impl InMemoryNotesBackend {
    pub fn new(now: i64, suffixes: &[u8]) -> Self {
        Self {
            options: MemoryOptionStore::new(),
            clock: FixedClock::new(now),
            suffixes: ScriptedSuffix::new(suffixes),
            events: InMemoryEventSink::new(),
            allowed: AllowedHtml::default(),
            user: "admin".to_string(),
        }
    }

    pub fn with_options(mut self, options: MemoryOptionStore) -> Self {
        self.options = options;
        self
    }

    pub fn with_allowed_html(mut self, allowed: AllowedHtml) -> Self {
        self.allowed = allowed;
        self
    }
}

impl NotesBackend for InMemoryNotesBackend {
    fn options(&self) -> &dyn OptionStore {
        &self.options
    }

    fn list_plugins(&self, prefix: &str) -> Result<Vec<String>, String> {
        Ok(self
            .options
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    fn allowed_html(&self) -> AllowedHtml {
        self.allowed.clone()
    }

    fn clock(&self) -> &dyn Clock {
        &self.clock
    }

    fn suffixes(&self) -> &dyn SuffixSource {
        &self.suffixes
    }

    fn events(&self) -> &dyn NoteEventSink {
        &self.events
    }

    fn default_user(&self) -> String {
        self.user.clone()
    }
}

mod args;
pub mod has;
pub mod list;
pub mod logging;
pub mod note_edit;
pub mod plugins;
pub mod remove;
pub mod render;
pub mod show;

pub fn run_cli_for_test(args: &[&str], backend: &dyn NotesBackend) -> CommandOutput {
    let Some((cmd, rest)) = args.split_first() else {
        return CommandOutput::ok(help_text());
    };

    match *cmd {
        "--help" | "-h" | "help" => CommandOutput::ok(help_text()),
        "--version" | "-v" => CommandOutput::ok(format!("plugin-notes version {}\n", get_version())),
        "add" => note_edit::run_add_for_test(rest, backend),
        "edit" => note_edit::run_edit_for_test(rest, backend),
        "has" => has::run_has_for_test(rest, backend),
        "list" | "ls" => list::run_list_for_test(rest, backend),
        "plugins" => plugins::run_plugins_for_test(rest, backend),
        "purge" => remove::run_purge_for_test(rest, backend),
        "render" => render::run_render_for_test(rest, backend),
        "rm" | "delete" => remove::run_rm_for_test(rest, backend),
        "show" => show::run_show_for_test(rest, backend),
        _ => CommandOutput {
            stdout: String::new(),
            stderr: format!("Error: unknown command \"{cmd}\" for \"plugin-notes\"\n"),
            exit_code: 1,
        },
    }
}

pub fn run_cli(args: &[String], backend: &dyn NotesBackend) -> CommandOutput {
    let refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    run_cli_for_test(&refs, backend)
}

/// Split a leading `--config FILE` / `--config=FILE` off `args`.
pub fn split_config_flag(args: &[String]) -> Result<(Option<PathBuf>, &[String]), String> {
    match args.split_first() {
        Some((first, rest)) if first == "--config" => match rest.split_first() {
            Some((path, rest)) => Ok((Some(PathBuf::from(path)), rest)),
            None => Err("flag needs an argument: --config".to_string()),
        },
        Some((first, rest)) => match first.strip_prefix("--config=") {
            Some(path) => Ok((Some(PathBuf::from(path)), rest)),
            None => Ok((None, args)),
        },
        None => Ok((None, args)),
    }
}

/// Whether `args` only asks for help or the version, so no backend is needed.
pub fn is_meta_invocation(args: &[String]) -> bool {
    match args.first().map(String::as_str) {
        None => true,
        Some("--help" | "-h" | "help" | "--version" | "-v") => true,
        Some(_) => args.iter().any(|arg| arg == "--help" || arg == "-h"),
    }
}

/// Run the installed binary: config, logging, SQLite backend, dispatch.
pub fn run_main(args: &[String]) -> CommandOutput {
    let (config_path, rest) = match split_config_flag(args) {
        Ok(split) => split,
        Err(message) => return CommandOutput::usage(message),
    };
    if is_meta_invocation(rest) {
        return run_cli(rest, &NoBackend);
    }

    let cfg = match Config::load(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => return CommandOutput::failure(format!("load config: {err}")),
    };
    if let Err(message) = logging::init_logging(&cfg.logging) {
        return CommandOutput::failure(message);
    }
    tracing::debug!(database = %cfg.database_path().display(), "opening notes backend");

    let backend = match SqliteNotesBackend::open(&cfg) {
        Ok(backend) => backend,
        Err(err) => {
            tracing::error!(error = %err, "open notes database failed");
            return CommandOutput::failure(format!("open database: {err}"));
        }
    };
    run_cli(rest, &backend)
}

/// Stand-in for help and version output, which never touch storage.
struct NoBackend;

impl NotesBackend for NoBackend {
    fn options(&self) -> &dyn OptionStore {
        &EMPTY_OPTIONS
    }

    fn list_plugins(&self, _prefix: &str) -> Result<Vec<String>, String> {
        Ok(Vec::new())
    }

    fn default_user(&self) -> String {
        String::new()
    }
}

struct EmptyOptions;

static EMPTY_OPTIONS: EmptyOptions = EmptyOptions;

impl OptionStore for EmptyOptions {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn add(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::backend("storage is not open"))
    }

    fn update(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::backend("storage is not open"))
    }

    fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::backend("storage is not open"))
    }
}

/// Render a `NoteError` as a one-line CLI failure.
pub(crate) fn note_failure(action: &str, err: &NoteError) -> CommandOutput {
    let code = if matches!(err, NoteError::MissingPluginId) { 2 } else { 1 };
    CommandOutput {
        stdout: String::new(),
        stderr: format!("{action}: {err}\n"),
        exit_code: code,
    }
}
