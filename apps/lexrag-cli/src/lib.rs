//! Shared start-up for the command-line apps.

use std::path::PathBuf;

use lexrag_core::config::{Config, Settings};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

/// `RUST_LOG` wins; otherwise `info`. Logs go to stderr so stdout stays clean
/// for answers and JSON.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Settings from the working directory, plus that directory as the base for
/// relative paths.
pub fn load_settings() -> anyhow::Result<(Settings, PathBuf)> {
    let base = std::env::current_dir()?;
    let config = Config::load()?;
    Ok((config.settings()?, base))
}
