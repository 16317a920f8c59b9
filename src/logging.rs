use crate::error::{DocForgeError, Result};
use env_logger::{Builder, Env};
use log::LevelFilter;
use chrono::Local;
use std::io::Write;
use yansi::Paint;

const CRATE_TARGET: &str = "docforge";

/// Initializes logging for the CLI
///
/// docforge's own modules log at `log_level`; HTTP and zip dependencies stay
/// at warn so a `debug` run shows chunking and backend calls, not connection
/// pool chatter. `RUST_LOG` replaces the whole filter when set.
pub fn init(log_level: &str) -> Result<()> {
    let env = Env::default()
        .filter_or("RUST_LOG", default_filter(log_level))
        .write_style_or("RUST_LOG_STYLE", "auto");

    Builder::from_env(env)
        .format(|buf, record| writeln!(buf, "{}", format_log(record)))
        .try_init()
        .map_err(|e| DocForgeError::Config(format!("logger already initialized: {}", e)))
}

/// Filter directive used when `RUST_LOG` is unset
pub fn default_filter(log_level: &str) -> String {
    let level = parse_log_level(log_level);
    let name = level.to_string().to_lowercase();
    if level <= LevelFilter::Warn {
        name
    } else {
        format!("warn,{}={}", CRATE_TARGET, name)
    }
}

/// One log line: `[timestamp] LEVEL [module] message`
///
/// docforge targets lose their crate prefix, so pipeline progress reads
/// `[pipeline] ...` and backend calls `[llm::openai] ...`. Dependency
/// targets are printed in full.
pub fn format_log(record: &log::Record) -> String {
    let level = match record.level() {
        log::Level::Error => Paint::red("ERROR").bold(),
        log::Level::Warn => Paint::yellow("WARN ").bold(),
        log::Level::Info => Paint::cyan("INFO ").bold(),
        log::Level::Debug => Paint::blue("DEBUG").bold(),
        log::Level::Trace => Paint::new("TRACE"),
    };

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let target = match record.target() {
        "" => record.module_path().unwrap_or(CRATE_TARGET),
        target => target,
    };
    let target = target
        .strip_prefix(CRATE_TARGET)
        .and_then(|rest| rest.strip_prefix("::"))
        .unwrap_or(target);

    format!("[{}] {} [{}] {}", timestamp, level, target, record.args())
}

/// Maps `--log-level` to a filter; unknown names mean info
pub fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}
