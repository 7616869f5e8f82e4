//! Logger set-up for the `times2lca` binary.
//!
//! The library reports ambiguous flow matches, unit listings and the progress of harmonisation
//! plans through the `log` facade. The binary sends these to the console and, for the `harmonise`
//! command, to two log files in the output folder so that the warnings raised while editing an
//! inventory are kept next to the edited inventory.
use anyhow::{Context, Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::OnceLock;

/// Set once the logger has been installed
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The default log level for the program.
///
/// Used as a fallback if the user hasn't specified something else with the
/// [`LOG_LEVEL_ENV_VAR`] environment variable or the settings.toml file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which overrides the log level
pub const LOG_LEVEL_ENV_VAR: &str = "TIMES2LCA_LOG_LEVEL";

/// Log file for messages below warning level
const LOG_INFO_FILE_NAME: &str = "times2lca_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "times2lca_error.log";

/// Prefix stripped from log targets, so messages show the module they come from
const TARGET_PREFIX: &str = "times2lca::";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger.
///
/// The level is taken from the [`LOG_LEVEL_ENV_VAR`] environment variable if set, otherwise from
/// `settings.toml`, otherwise [`DEFAULT_LOG_LEVEL`]. Accepted levels are `off`, `error`, `warn`,
/// `info`, `debug` and `trace`.
///
/// Messages below warning level go to stdout and warnings and errors to stderr, coloured when
/// writing to a terminal. If `log_file_dir` is given, `times2lca_info.log` and
/// `times2lca_error.log` are (re)created there; the info file records at least `info` messages
/// whatever the console level.
pub fn init(log_level_from_settings: Option<&str>, log_file_dir: Option<&Path>) -> Result<()> {
    let env_level = env::var(LOG_LEVEL_ENV_VAR).ok();
    let log_level = resolve_log_level(env_level.as_deref(), log_level_from_settings)?;

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let stdout_colours = io::stdout().is_terminal().then_some(colours);
    let stderr_colours = io::stderr().is_terminal().then_some(colours);
    let mut dispatch = Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    write_console(out, message, record, stdout_colours.as_ref());
                })
                .level(log_level)
                .chain(io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    write_console(out, message, record, stderr_colours.as_ref());
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(io::stderr()),
        );

    if let Some(dir) = log_file_dir {
        let info_file = create_log_file(dir, LOG_INFO_FILE_NAME)?;
        let error_file = create_log_file(dir, LOG_ERROR_FILE_NAME)?;
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(write_file)
                    .level(log_level.max(LevelFilter::Info))
                    .chain(info_file),
            )
            .chain(
                Dispatch::new()
                    .format(write_file)
                    .level(LevelFilter::Warn)
                    .chain(error_file),
            );
    }

    dispatch.apply().context("Logger already initialised")?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

/// Pick the log level from the environment, then the settings file, then the default
fn resolve_log_level(from_env: Option<&str>, from_settings: Option<&str>) -> Result<LevelFilter> {
    let name = from_env.or(from_settings).unwrap_or(DEFAULT_LOG_LEVEL);
    parse_log_level(name)
}

/// Convert a log level name (case insensitive) to a [`LevelFilter`]
fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    let log_level = match log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(log_level)
}

/// Create (or truncate) a log file in `dir`
fn create_log_file(dir: &Path, file_name: &str) -> Result<File> {
    let path = dir.join(file_name);
    File::create(&path).with_context(|| format!("Could not create log file {}", path.display()))
}

/// The module a message came from, without the crate name
fn short_target(target: &str) -> &str {
    target.strip_prefix(TARGET_PREFIX).unwrap_or(target)
}

/// Console lines carry the time of day only
fn write_console(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    let time = Local::now().format("%H:%M:%S");
    let target = short_target(record.target());
    match colours {
        Some(colours) => out.finish(format_args!(
            "[{time} {} {target}] {message}",
            colours.color(record.level())
        )),
        None => out.finish(format_args!(
            "[{time} {} {target}] {message}",
            record.level()
        )),
    }
}

/// Log file lines carry the full date
fn write_file(out: FormatCallback, message: &Arguments, record: &Record) {
    out.finish(format_args!(
        "[{} {} {}] {message}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        record.level(),
        short_target(record.target())
    ));
}
