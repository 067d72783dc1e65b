use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

pub fn init_tracing(verbosity: u8) -> Result<()> {
    let default_directive = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let subscriber = fmt().with_env_filter(filter).with_target(true).finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        warn!("tracing subscriber already initialized");
    }

    Ok(())
}

pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()
            .context("failed to read current directory")?
            .join(path))
    }
}

pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    extensions.iter().any(|ext| {
        name.strip_suffix(ext.as_ref())
            .and_then(|stem| stem.strip_suffix('.'))
            .is_some()
    })
}

pub fn normalize_relative_path(path: &Path) -> String {
    path.iter()
        .map(|component| component.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn ensure_relative(path: &Path, root: &Path) -> Result<PathBuf> {
    path.strip_prefix(root)
        .map(|p| p.to_path_buf())
        .with_context(|| format!("{} is not inside {}", path.display(), root.display()))
}
