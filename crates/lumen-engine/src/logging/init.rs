use std::sync::Once;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "LUMEN_LOG";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "lumen_engine=debug,wgpu=warn").
///
/// `write_style` controls ANSI coloring behavior.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Returns a config with an explicit filter, overriding the environment.
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            env_filter: Some(filter.into()),
            ..Self::default()
        }
    }

    /// Resolves the effective filter string.
    ///
    /// Order: explicit filter, `LUMEN_LOG`, `RUST_LOG`. `None` means the
    /// caller falls back to `info`.
    fn resolve_filter(&self) -> Option<String> {
        [
            self.env_filter.clone(),
            std::env::var(LOG_ENV).ok(),
            std::env::var("RUST_LOG").ok(),
        ]
        .into_iter()
        .flatten()
        .find(|f| !f.trim().is_empty())
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// This function is idempotent; subsequent calls are ignored. The render
/// thread and the image decode helper log through the same backend, so this
/// must run before the host runtime starts.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match config.resolve_filter() {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                // wgpu is chatty at info; keep it at warn unless asked.
                builder
                    .filter_level(log::LevelFilter::Info)
                    .filter_module("wgpu_core", log::LevelFilter::Warn)
                    .filter_module("wgpu_hal", log::LevelFilter::Warn);
            }
        }

        builder.write_style(config.write_style);

        builder.format_timestamp_millis();

        if builder.try_init().is_err() {
            // Another logger was installed by the embedding application.
            return;
        }

        log::debug!("logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let cfg = LoggingConfig::with_filter("lumen_engine=trace");
        assert_eq!(cfg.resolve_filter().as_deref(), Some("lumen_engine=trace"));
    }

    #[test]
    fn blank_filter_is_ignored() {
        let cfg = LoggingConfig::with_filter("   ");
        // Falls through to the environment, which may or may not be set.
        assert_ne!(cfg.resolve_filter().as_deref(), Some("   "));
    }

    #[test]
    fn init_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig::with_filter("debug"));
    }
}
