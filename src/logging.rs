//! Logging bootstrap for applications embedding the ODM.
//!
//! The library itself only emits `tracing` events. Applications either call
//! [`init_logging`] once at startup or install their own subscriber; a
//! repository can also be given its own logger with
//! [`Repository::with_logger`](crate::Repository::with_logger).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "gitodm=info";

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig<'a> {
    /// Filter directives used when `RUST_LOG` is unset. Defaults to `gitodm=info`.
    pub filter: Option<&'a str>,
    /// Log at debug level regardless of the filter.
    pub verbose: bool,
    /// Colour output.
    pub ansi: bool,
}

impl LogConfig<'_> {
    fn env_filter(&self) -> EnvFilter {
        if self.verbose {
            return EnvFilter::new("gitodm=debug");
        }
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.filter.unwrap_or(DEFAULT_LOG_FILTER)))
    }
}

/// Install a stderr `fmt` subscriber as the global default.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes. Safe to call more than once.
pub fn init_logging(config: LogConfig<'_>) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.ansi)
                .with_filter(config.env_filter()),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        // the first call may lose to another test; the second always does
        init_logging(LogConfig::default());
        let second = init_logging(LogConfig {
            verbose: true,
            ..LogConfig::default()
        });

        assert!(!second);
    }

    #[test]
    fn test_filter_selection() {
        let verbose = LogConfig {
            verbose: true,
            ..LogConfig::default()
        };
        assert_eq!(verbose.env_filter().to_string(), "gitodm=debug");
    }
}
