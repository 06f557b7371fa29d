//! Logging setup: a tracing-subscriber fmt layer on stderr, with `log`
//! records from the library bridged in through `LogTracer`.

use ingestwatch::config::LoggingConfig;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Builds the filter from `RUST_LOG` if set, else from `level`, keeping the
/// HTTP stack quiet.
fn build_env_filter(level: &str) -> Result<EnvFilter, BoxError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = format!("{},hyper=warn,hyper_util=warn,reqwest=warn", level);
    Ok(EnvFilter::try_new(directives)?)
}

pub fn init(config: &LoggingConfig, level: Option<&str>) -> Result<(), BoxError> {
    let filter = build_env_filter(level.unwrap_or(&config.level))?;
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        let layer = fmt::layer().json().with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(registry.with(layer))?;
    } else {
        let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(registry.with(layer))?;
    }

    LogTracer::init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_levels() {
        assert!(build_env_filter("debug").is_ok());
        assert!(build_env_filter("ingestwatch=trace").is_ok());
    }
}
