//! Stderr tracing setup for the `plugin-notes` binary.

use notes_core::config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `cfg.level`.
pub fn init_logging(cfg: &LoggingConfig) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&cfg.level)))
        .map_err(|err| format!("invalid log filter: {err}"))?;

    let json = is_json(&cfg.format);
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
    });
    let console_layer = (!json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| format!("init logging: {err}"))
}

/// Filter directives for a configured level; unknown or blank levels fall
/// back to `info`.
pub fn default_directives(level: &str) -> String {
    match level.trim().to_lowercase().as_str() {
        level @ ("debug" | "info" | "warn" | "error") => level.to_string(),
        _ => "info".to_string(),
    }
}

fn is_json(format: &str) -> bool {
    format.trim().eq_ignore_ascii_case("json")
}
