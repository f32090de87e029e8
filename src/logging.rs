//! Console logging.
//!
//! Events go to stderr through `tracing-subscriber`. The level is known only
//! after configuration is resolved, so the subscriber starts with the level
//! given on the command line and is reloaded once the configured level is
//! available. `RUST_LOG` directives take precedence over both.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{Registry, fmt, prelude::*, reload};

use crate::config::LogLevel;

/// Handle used to change the console level after initialisation.
#[derive(Debug, Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replaces the console level.
    ///
    /// # Errors
    ///
    /// Returns `reload::Error` if the subscriber is gone.
    pub fn apply(&self, level: Option<LogLevel>, quiet: bool) -> Result<(), reload::Error> {
        self.filter.reload(env_filter(level_filter(level, quiet)))
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns `TryInitError` if a global subscriber is already installed.
pub fn init(level: Option<LogLevel>, quiet: bool) -> Result<LogHandle, TryInitError> {
    let (filter, handle) = reload::Layer::new(env_filter(level_filter(level, quiet)));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(LogHandle { filter: handle })
}

/// Maps a configured level to a tracing filter.
///
/// No level means warnings and errors only. `quiet` never allows more than
/// warnings.
#[must_use]
pub fn level_filter(level: Option<LogLevel>, quiet: bool) -> LevelFilter {
    let filter = match level {
        Some(LogLevel::Critical | LogLevel::Fatal | LogLevel::Error) => LevelFilter::ERROR,
        Some(LogLevel::Warn | LogLevel::Warning) | None => LevelFilter::WARN,
        Some(LogLevel::Info) => LevelFilter::INFO,
        Some(LogLevel::Debug) => LevelFilter::DEBUG,
        Some(LogLevel::NotSet) => LevelFilter::TRACE,
    };
    if quiet {
        filter.min(LevelFilter::WARN)
    } else {
        filter
    }
}

fn env_filter(default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, false, LevelFilter::WARN)]
    #[case(Some(LogLevel::Critical), false, LevelFilter::ERROR)]
    #[case(Some(LogLevel::Fatal), false, LevelFilter::ERROR)]
    #[case(Some(LogLevel::Warning), false, LevelFilter::WARN)]
    #[case(Some(LogLevel::Info), false, LevelFilter::INFO)]
    #[case(Some(LogLevel::Debug), false, LevelFilter::DEBUG)]
    #[case(Some(LogLevel::NotSet), false, LevelFilter::TRACE)]
    #[case(Some(LogLevel::Debug), true, LevelFilter::WARN)]
    #[case(Some(LogLevel::Error), true, LevelFilter::ERROR)]
    fn levels_map_to_filters(
        #[case] level: Option<LogLevel>,
        #[case] quiet: bool,
        #[case] expected: LevelFilter,
    ) {
        assert_eq!(level_filter(level, quiet), expected);
    }
}
