use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aroma_engine::logging::LoggingConfig;
use aroma_engine::window::RuntimeConfig;
use clap::Parser;
use winit::dpi::LogicalSize;

/// Runs a Lua script against the aroma 2D runtime.
#[derive(Debug, Parser)]
#[command(name = "aroma", version, about)]
pub struct Args {
    /// Entry script. Image paths inside it resolve relative to its directory.
    #[arg(default_value = "main.lua")]
    pub script: PathBuf,

    /// Window width in logical pixels.
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Window height in logical pixels.
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Window title. Defaults to the script's directory name.
    #[arg(long)]
    pub title: Option<String>,

    /// Log filter in `env_logger` syntax (overrides `RUST_LOG`).
    #[arg(long)]
    pub log: Option<String>,
}

impl Args {
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            env_filter: self.log.clone(),
            ..LoggingConfig::default()
        }
    }

    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: self.title.clone().unwrap_or_else(|| default_title(&self.script)),
            size: LogicalSize::new(f64::from(self.width), f64::from(self.height)),
            ..RuntimeConfig::default()
        }
    }

    /// Directory the script lives in, if it names one.
    pub fn script_dir(&self) -> Option<&Path> {
        self.script.parent().filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Resolves the window config, then moves into the script's directory so
    /// relative asset paths resolve against it. Returns the config and the
    /// script path relative to the new working directory.
    pub fn enter_script_dir(&self) -> Result<(RuntimeConfig, PathBuf)> {
        let runtime = self.runtime();
        let Some(dir) = self.script_dir() else {
            return Ok((runtime, self.script.clone()));
        };
        std::env::set_current_dir(dir).with_context(|| format!("failed to enter {}", dir.display()))?;
        let script = self
            .script
            .file_name()
            .map(PathBuf::from)
            .context("script path has no file name")?;
        Ok((runtime, script))
    }
}

fn default_title(script: &Path) -> String {
    script
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "aroma".to_string())
}
