use std::fmt;

use tracing::info;

/// Build mode as reported by the build tool (`NODE_ENV`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildMode {
    Production,
    Development,
    Test,
    Other(String),
}

impl BuildMode {
    pub fn is_production(&self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl From<&str> for BuildMode {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => BuildMode::Production,
            "development" | "dev" => BuildMode::Development,
            "test" => BuildMode::Test,
            _ => BuildMode::Other(value.trim().to_string()),
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Production => f.write_str("production"),
            BuildMode::Development => f.write_str("development"),
            BuildMode::Test => f.write_str("test"),
            BuildMode::Other(mode) => f.write_str(mode),
        }
    }
}

/// One execution of the build. Owns the guard that lets search indexing run
/// at most once, and only for production builds.
#[derive(Debug)]
pub struct BuildInvocation {
    mode: BuildMode,
    indexing_started: bool,
}

impl BuildInvocation {
    pub fn new(mode: BuildMode) -> Self {
        Self {
            mode,
            indexing_started: false,
        }
    }

    pub fn mode(&self) -> &BuildMode {
        &self.mode
    }

    /// Runs `index` unless indexing already started in this invocation or the
    /// build is not a production build. Returns `None` when skipped.
    pub fn run_indexing<T>(&mut self, index: impl FnOnce() -> T) -> Option<T> {
        if self.indexing_started {
            info!("search indexing already ran for this build; skipping");
            return None;
        }
        self.indexing_started = true;

        if !self.mode.is_production() {
            info!(mode = %self.mode, "skipping search indexing in non-production mode");
            return None;
        }

        Some(index())
    }
}
