use std::sync::Once;

use env_logger::WriteStyle;
use log::LevelFilter;

/// Where log output goes and how much of it.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter directives, e.g. `"debug"` or `"aroma_lua=trace"`.
    /// Takes precedence over `RUST_LOG`.
    pub env_filter: Option<String>,
    pub write_style: WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { env_filter: None, write_style: WriteStyle::Auto }
    }
}

impl LoggingConfig {
    /// Explicit filter, then `RUST_LOG`, then nothing (the `info` baseline applies).
    fn directives(&self) -> Option<String> {
        self.env_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .filter(|d| !d.trim().is_empty())
    }
}

/// GPU stack crates that flood `info`.
const GPU_CRATES: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

static INSTALL: Once = Once::new();

/// Installs the global `env_logger`. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INSTALL.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(LevelFilter::Info).write_style(config.write_style);
        for krate in GPU_CRATES {
            builder.filter_module(krate, LevelFilter::Warn);
        }
        if let Some(directives) = config.directives() {
            builder.parse_filters(&directives);
        }

        match builder.try_init() {
            Ok(()) => log::debug!("logger installed"),
            Err(_) => log::debug!("a logger was already installed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let config = LoggingConfig { env_filter: Some("aroma_lua=trace".into()), ..Default::default() };
        assert_eq!(config.directives().as_deref(), Some("aroma_lua=trace"));
    }

    #[test]
    fn blank_filter_is_ignored() {
        let config = LoggingConfig { env_filter: Some("  ".into()), ..Default::default() };
        assert!(config.directives().is_none());
    }

    #[test]
    fn second_init_is_a_no_op() {
        init_logging(LoggingConfig { env_filter: Some("debug".into()), ..Default::default() });
        init_logging(LoggingConfig::default());
        log::debug!("logger survives repeated init");
    }
}
