use clap::ValueEnum;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
        }
    }
}

/// Install a global fmt subscriber capped at `level`.
///
/// Returns an error if a global subscriber was already installed.
pub fn init_tracing(level: LogLevel) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::from(level))
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

/// Detach the process into the background when `enable` is true.
///
/// This uses the [`daemonize`](https://docs.rs/daemonize) crate under the
/// hood. Foreground runs pass `false` to skip daemonization.
pub fn maybe_daemonize(enable: bool) -> anyhow::Result<()> {
    if enable {
        daemonize::Daemonize::new()
            .start()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn default_level_is_info() {
        assert_eq!(LevelFilter::from(LogLevel::default()), LevelFilter::INFO);
    }

    #[test]
    fn trace_maps_to_trace() {
        assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::TRACE);
    }
}
