use chrono::Local;
use colored::Colorize;
use fern::Dispatch;
use log::LevelFilter;
use std::fs::create_dir_all;
use std::path::Path;

/// Maps a textual level to a filter. Unknown values fall back to `Info`.
pub fn parse_level(log_level: &str) -> LevelFilter {
    match log_level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Installs the global logger, writing to stdout (when `to_stdout`) and to
/// `log_file_path` in append mode.
///
/// Lines look like `[2025-09-08 10:00:14][INFO][services::attendance_token::verifier] ...`.
pub fn init_logger(
    log_level: &str,
    log_file_path: &str,
    to_stdout: bool,
) -> Result<(), fern::InitError> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            create_dir_all(parent)?;
        }
    }

    let mut dispatch = Dispatch::new()
        .format(|out, message, record| {
            let level_str = match record.level() {
                log::Level::Error => "ERROR".red(),
                log::Level::Warn => "WARN".yellow(),
                log::Level::Info => "INFO".green(),
                log::Level::Debug => "DEBUG".cyan(),
                log::Level::Trace => "TRACE".normal(),
            };

            out.finish(format_args!(
                "[{}][{}][{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                level_str,
                record.target(),
                message
            ))
        })
        .level(parse_level(log_level))
        .chain(fern::log_file(log_file_path)?);

    if to_stdout {
        dispatch = dispatch.chain(std::io::stdout());
    }

    dispatch.apply()?;
    Ok(())
}
