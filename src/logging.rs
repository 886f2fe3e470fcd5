use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::PvConfig;

/// Installs the global subscriber: stdout always, plus `<log_dir>/app.log` when enabled.
pub fn init(config: &PvConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = if config.log_file_enabled {
        let file = open_log_file(&config.log_file_path())?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if config.log_file_enabled {
        tracing::info!(path = %config.log_file_path().display(), "writing logs to file");
    }
    Ok(())
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn creates_missing_log_directory() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested/logs/app.log");

        open_log_file(&path)?;
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn appends_to_existing_log_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("app.log");
        fs::write(&path, "first\n")?;

        let mut file = open_log_file(&path)?;
        writeln!(file, "second")?;
        drop(file);

        assert_eq!(fs::read_to_string(&path)?, "first\nsecond\n");
        Ok(())
    }
}
