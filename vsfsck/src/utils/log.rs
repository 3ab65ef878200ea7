// SPDX-License-Identifier: MIT

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
    Trace,
}

impl LogLevel {
    /// `-q` wins over any number of `-v`.
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => LogLevel::Quiet,
            (false, 0) => LogLevel::Normal,
            (false, 1) => LogLevel::Verbose,
            _ => LogLevel::Trace,
        }
    }

    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Quiet => LevelFilter::Warn,
            LogLevel::Normal => LevelFilter::Info,
            LogLevel::Verbose => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

struct CliLogger;

static LOGGER: CliLogger = CliLogger;

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow().bold(),
            Level::Info => "info".green(),
            Level::Debug => "debug".blue(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("[vsfsck] {tag}: {}", record.args());
    }

    fn flush(&self) {}
}

/// Installs the CLI logger. Only the first call has an effect.
pub fn init(level: LogLevel) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level.filter());
    }
}

#[macro_export]
macro_rules! log_normal {
    ($($arg:tt)*) => {
        println!("[vsfsck] {}", format_args!($($arg)*));
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_to_level() {
        assert_eq!(LogLevel::from_flags(false, 0), LogLevel::Normal);
        assert_eq!(LogLevel::from_flags(false, 1), LogLevel::Verbose);
        assert_eq!(LogLevel::from_flags(false, 5), LogLevel::Trace);
        assert_eq!(LogLevel::from_flags(true, 2), LogLevel::Quiet);
        assert_eq!(LogLevel::Quiet.filter(), LevelFilter::Warn);
    }
}
