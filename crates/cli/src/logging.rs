use anyhow::anyhow;
use tracing::Level;

use rigquote_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};

/// Installs the global subscriber. Events go to stderr so command output on
/// stdout stays a single JSON document.
///
/// A config that fails to load still gets default logging; the command itself
/// reports the config error.
pub fn init(options: &LoadOptions) -> anyhow::Result<()> {
    let logging = AppConfig::load(options.clone())
        .map(|config| config.logging)
        .unwrap_or_else(|_| fallback(options));
    let level = logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr);
    let installed = match logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow!("failed to install tracing subscriber: {error}"))
}

fn fallback(options: &LoadOptions) -> LoggingConfig {
    let mut logging = AppConfig::default().logging;
    if let Some(level) = &options.overrides.log_level {
        logging.level = level.clone();
    }
    if let Some(format) = options.overrides.log_format {
        logging.format = format;
    }
    logging
}
