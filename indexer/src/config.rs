use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};

pub const DEFAULT_CONTENT_DIR: &str = "app/docs";
pub const DEFAULT_EXTENSION: &str = "mdx";

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Root that document routes are derived relative to.
    pub project_root: PathBuf,
    /// Directory walked for content files. Must live under `project_root`.
    pub content_dir: PathBuf,
    pub extensions: Vec<String>,
}

impl IndexerConfig {
    pub fn new(project_root: PathBuf, content_dir: PathBuf, extensions: Vec<String>) -> Result<Self> {
        if !content_dir.starts_with(&project_root) {
            bail!(
                "content directory {} is not inside project root {}",
                content_dir.display(),
                project_root.display()
            );
        }

        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_string())
            .filter(|ext| !ext.is_empty())
            .collect();

        if extensions.is_empty() {
            bail!("at least one content file extension is required");
        }

        Ok(Self {
            project_root,
            content_dir,
            extensions,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub access_token: String,
    pub request_timeout: Option<Duration>,
}

impl RemoteConfig {
    pub fn new(
        endpoint: Option<String>,
        access_token: Option<String>,
        request_timeout: Option<Duration>,
    ) -> Result<Self> {
        let endpoint = match endpoint.map(|e| e.trim().to_string()) {
            Some(endpoint) if !endpoint.is_empty() => endpoint,
            _ => bail!("--endpoint or NEXT_PUBLIC_SEARCH_ENDPOINT is required"),
        };
        let access_token = match access_token.map(|t| t.trim().to_string()) {
            Some(token) if !token.is_empty() => token,
            _ => bail!("--access-token or NEXT_SEARCH_ACCESS_TOKEN is required"),
        };

        if let Some(timeout) = request_timeout {
            if timeout.is_zero() {
                bail!("request timeout must be greater than zero");
            }
        }

        Ok(Self {
            endpoint,
            access_token,
            request_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_extensions() {
        let cfg = IndexerConfig::new(
            PathBuf::from("/site"),
            PathBuf::from("/site/app/docs"),
            vec![".mdx".into(), " md ".into(), "".into()],
        )
        .expect("config");
        assert_eq!(cfg.extensions, vec!["mdx".to_string(), "md".to_string()]);
    }

    #[test]
    fn rejects_content_dir_outside_project() {
        let err = IndexerConfig::new(
            PathBuf::from("/site"),
            PathBuf::from("/elsewhere/docs"),
            vec![DEFAULT_EXTENSION.into()],
        )
        .expect_err("should fail");
        assert!(err.to_string().contains("not inside project root"));
    }

    #[test]
    fn remote_config_requires_endpoint_and_token() {
        let err = RemoteConfig::new(None, Some("token".into()), None).expect_err("should fail");
        assert!(err.to_string().contains("NEXT_PUBLIC_SEARCH_ENDPOINT"));

        let err = RemoteConfig::new(Some("https://search.example.com/graphql".into()), Some("  ".into()), None)
            .expect_err("should fail");
        assert!(err.to_string().contains("NEXT_SEARCH_ACCESS_TOKEN"));

        let err = RemoteConfig::new(
            Some("https://search.example.com/graphql".into()),
            Some("token".into()),
            Some(Duration::ZERO),
        )
        .expect_err("should fail");
        assert!(err.to_string().contains("greater than zero"));
    }
}
