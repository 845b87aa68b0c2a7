//! Logging setup
//!
//! Two simplelog sinks: a colored terminal logger and a plain file logger,
//! both at the level configured through `LOG_LEVEL`.

use std::fs::File;
use std::str::FromStr;

use anyhow::{Context, Result};
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use crate::core::config;

/// Parses a level name, falling back to Info on anything unrecognized.
fn parse_level(raw: &str) -> LevelFilter {
    LevelFilter::from_str(raw).unwrap_or(LevelFilter::Info)
}

/// Installs the global logger writing to the terminal and to `log_file_path`.
/// Must be called once, before any other component logs; a second call fails
/// because the global logger is already set.
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let file =
        File::create(log_file_path).with_context(|| format!("failed to create log file {}", log_file_path))?;
    let level = parse_level(&config::LOG_LEVEL);

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, Config::default(), file),
    ])
    .context("logger already initialized")?;

    Ok(())
}
