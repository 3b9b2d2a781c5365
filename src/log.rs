//! Program logging, built on `fern`.
//!
//! Informational messages go to stdout and warnings/errors to stderr, coloured when writing to a
//! terminal. When an output folder is given, the same messages are also copied to plain-text log
//! files there.
use anyhow::{Context, Result, bail, ensure};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback, Output};
use log::{LevelFilter, Metadata, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// Set once the logger has been installed
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used when neither the environment nor the settings file specify one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which overrides the configured log level
pub const LOG_LEVEL_ENV_VAR: &str = "POWERDISPATCH_LOG_LEVEL";

/// Log file for messages below warning level
const LOG_INFO_FILE_NAME: &str = "powerdispatch_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "powerdispatch_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger.
///
/// The level is taken from the `POWERDISPATCH_LOG_LEVEL` environment variable if set, otherwise
/// from `log_level_from_settings`, otherwise [`DEFAULT_LOG_LEVEL`]. Accepted levels are `off`,
/// `error`, `warn`, `info`, `debug` and `trace` (case insensitive).
///
/// # Arguments
///
/// * `log_level_from_settings` - The log level from `settings.toml`, if any
/// * `log_dir` - Folder in which to create log files. No files are written if `None`.
///
/// # Returns
///
/// An error if the level is unknown, the log files cannot be created or a logger is already
/// installed.
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let level = resolve_log_level(log_level_from_settings)?;
    ensure!(!is_logger_initialised(), "Logger already initialised");

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let mut dispatch = Dispatch::new()
        .chain(console_chain(
            level,
            below_warning,
            std::io::stdout().is_terminal(),
            colours,
            std::io::stdout(),
        ))
        .chain(console_chain(
            level.min(LevelFilter::Warn),
            |_| true,
            std::io::stderr().is_terminal(),
            colours,
            std::io::stderr(),
        ));

    if let Some(log_dir) = log_dir {
        let (info_file, error_file) = create_log_files(log_dir)?;
        dispatch = dispatch
            .chain(file_chain(level.max(LevelFilter::Info), below_warning, info_file))
            .chain(file_chain(LevelFilter::Warn, |_| true, error_file));
    }

    dispatch.apply().context("Logger already initialised")?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

/// Pick the log level from the environment, then settings, then the default
fn resolve_log_level(log_level_from_settings: Option<&str>) -> Result<LevelFilter> {
    match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) => parse_log_level(&level)
            .with_context(|| format!("Invalid value for {LOG_LEVEL_ENV_VAR}")),
        Err(_) => parse_log_level(log_level_from_settings.unwrap_or(DEFAULT_LOG_LEVEL)),
    }
}

/// Convert a log level string (case insensitive) to a [`LevelFilter`]
pub(crate) fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    let level = match log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(level)
}

/// Filter which passes messages less severe than warnings
fn below_warning(metadata: &Metadata) -> bool {
    metadata.level() > LevelFilter::Warn
}

/// Create (or truncate) the info and error log files in `log_dir`
fn create_log_files(log_dir: &Path) -> Result<(File, File)> {
    let create = |file_name: &str| {
        let file_path = log_dir.join(file_name);
        File::create(&file_path)
            .with_context(|| format!("Could not create log file {}", file_path.display()))
    };

    Ok((create(LOG_INFO_FILE_NAME)?, create(LOG_ERROR_FILE_NAME)?))
}

/// A chain writing to the console, optionally with coloured levels
fn console_chain<F, O>(
    level: LevelFilter,
    filter: F,
    use_colour: bool,
    colours: ColoredLevelConfig,
    output: O,
) -> Dispatch
where
    F: Fn(&Metadata) -> bool + Send + Sync + 'static,
    O: Into<Output>,
{
    Dispatch::new()
        .filter(filter)
        .format(move |out, message, record| {
            if use_colour {
                write_log(out, colours.color(record.level()), record, message);
            } else {
                write_log(out, record.level(), record, message);
            }
        })
        .level(level)
        .chain(output)
}

/// A chain writing plain text to a log file
fn file_chain<F>(level: LevelFilter, filter: F, file: File) -> Dispatch
where
    F: Fn(&Metadata) -> bool + Send + Sync + 'static,
{
    Dispatch::new()
        .filter(filter)
        .format(|out, message, record| write_log(out, record.level(), record, message))
        .level(level)
        .chain(file)
}

/// Format a single log line as `[time level target] message`
fn write_log<T: Display>(out: FormatCallback, level: T, record: &Record, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!(
        "[{timestamp} {level} {}] {message}",
        record.target()
    ));
}
