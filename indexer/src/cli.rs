use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, error, info, warn};

use crate::client::GraphqlClient;
use crate::collector::Collector;
use crate::config::{DEFAULT_CONTENT_DIR, DEFAULT_EXTENSION, IndexerConfig, RemoteConfig};
use crate::invocation::{BuildInvocation, BuildMode};
use crate::output;
use crate::search;
use crate::sync::Synchronizer;
use crate::utils;

#[derive(Debug, Parser)]
#[command(
    name = "docsearch-indexer",
    version,
    about = "Index MDX documentation pages into a hosted search index"
)]
pub struct Cli {
    /// Increase logging verbosity (use -vv for trace level).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect documents and reconcile the search index (production builds only).
    Sync(SyncArgs),
    /// Collect documents and write them to a JSON file without contacting the index.
    Collect(CollectArgs),
    /// Query the search index and print the formatted results.
    Search(SearchArgs),
}

#[derive(Debug, Args)]
pub struct ContentArgs {
    /// Project root that document routes are derived relative to.
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,
    /// Directory to scan for content files, relative to the project root.
    #[arg(long, default_value = DEFAULT_CONTENT_DIR)]
    pub content_dir: PathBuf,
    /// Content file extension to index (repeatable).
    #[arg(long = "extension", default_value = DEFAULT_EXTENSION)]
    pub extensions: Vec<String>,
}

impl ContentArgs {
    fn resolve(&self) -> Result<IndexerConfig> {
        let project_root = utils::resolve_path(&self.project_root)?;
        let content_dir = project_root.join(&self.content_dir);
        IndexerConfig::new(project_root, content_dir, self.extensions.clone())
    }
}

#[derive(Debug, Args)]
pub struct RemoteArgs {
    /// GraphQL endpoint of the search index.
    #[arg(long, env = "NEXT_PUBLIC_SEARCH_ENDPOINT")]
    pub endpoint: Option<String>,
    /// Bearer token used to authenticate against the search index.
    #[arg(long, env = "NEXT_SEARCH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,
    /// Per-request timeout (e.g. "30s"). Defaults to no timeout.
    #[arg(long, value_parser = humantime::parse_duration)]
    pub request_timeout: Option<Duration>,
}

impl RemoteArgs {
    fn resolve(&self) -> Result<RemoteConfig> {
        RemoteConfig::new(
            self.endpoint.clone(),
            self.access_token.clone(),
            self.request_timeout,
        )
    }
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub content: ContentArgs,
    #[command(flatten)]
    pub remote: RemoteArgs,
    /// Build mode; indexing only runs for production builds.
    #[arg(long, env = "NODE_ENV", default_value = "development")]
    pub mode: String,
}

#[derive(Debug, Args)]
pub struct CollectArgs {
    #[command(flatten)]
    pub content: ContentArgs,
    /// Directory where documents.json will be written.
    #[arg(long, default_value = "index-output")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,
    /// Search query, e.g. `content_type:"mdx_doc"` or free text.
    pub query: String,
    /// Print results as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    utils::init_tracing(cli.verbose)?;

    match cli.command {
        Command::Sync(args) => run_sync(args),
        Command::Collect(args) => run_collect(args),
        Command::Search(args) => run_search(args),
    }
}

fn run_sync(args: SyncArgs) -> Result<()> {
    let mut invocation = BuildInvocation::new(BuildMode::from(args.mode.as_str()));
    debug!(mode = %invocation.mode(), "build invocation started");
    match invocation.run_indexing(|| index_build(&args)) {
        Some(result) => result,
        None => Ok(()),
    }
}

// Failures are logged and swallowed so indexing never fails the build.
fn index_build(args: &SyncArgs) -> Result<()> {
    let setup = args.content.resolve().and_then(|config| {
        let remote = args.remote.resolve()?;
        let client = GraphqlClient::new(&remote)?;
        Ok((config, client))
    });
    let (config, client) = match setup {
        Ok(setup) => setup,
        Err(err) => {
            error!(
                error = %format!("{err:#}"),
                "search indexing is misconfigured; search index left unchanged"
            );
            return Ok(());
        }
    };

    let collection = match Collector::new(config).run() {
        Ok(collection) => collection,
        Err(err) => {
            error!(
                error = %format!("{err:#}"),
                "failed to collect documents; search index left unchanged"
            );
            return Ok(());
        }
    };

    info!(
        documents = collection.documents.len(),
        skipped = collection.skipped.len(),
        "documents collected for indexing"
    );

    let report = Synchronizer::new(&client).run(&collection.documents);
    if !report.is_clean() {
        warn!(
            endpoint = client.endpoint(),
            failed_deletes = report.failed_deletes.len(),
            upsert_error = ?report.upsert_error,
            "search index synchronization finished with errors"
        );
    }

    Ok(())
}

fn run_collect(args: CollectArgs) -> Result<()> {
    let config = args.content.resolve()?;
    let output_dir = utils::resolve_path(&args.output_dir)?;

    let collection = Collector::new(config).run()?;
    let path = output::write_documents(&output_dir, &collection.documents)?;

    info!(
        output = %path.display(),
        documents = collection.documents.len(),
        skipped = collection.skipped.len(),
        "collection complete"
    );

    Ok(())
}

fn run_search(args: SearchArgs) -> Result<()> {
    if args.query.trim().is_empty() {
        bail!("search query is required");
    }

    let remote = args.remote.resolve()?;
    let client = GraphqlClient::new(&remote)?;
    let hits = search::search(&client, &args.query)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        for hit in &hits {
            println!("{}\t{}\t{}\t{}", hit.kind, hit.id, hit.path, hit.title);
        }
    }

    info!(results = hits.len(), "search complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sync_defaults() {
        let cli = Cli::try_parse_from([
            "docsearch-indexer",
            "sync",
            "--mode",
            "production",
            "--endpoint",
            "https://search.example.com/graphql",
            "--access-token",
            "secret",
            "--request-timeout",
            "30s",
        ])
        .expect("parse");

        let Command::Sync(args) = cli.command else {
            panic!("expected sync command");
        };
        assert_eq!(args.mode, "production");
        assert_eq!(args.content.content_dir, PathBuf::from("app/docs"));
        assert_eq!(args.content.extensions, vec!["mdx".to_string()]);
        assert_eq!(args.remote.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn repeated_extensions_replace_the_default() {
        let cli = Cli::try_parse_from([
            "docsearch-indexer",
            "collect",
            "--extension",
            "md",
            "--extension",
            "mdx",
        ])
        .expect("parse");

        let Command::Collect(args) = cli.command else {
            panic!("expected collect command");
        };
        assert_eq!(args.content.extensions, vec!["md".to_string(), "mdx".to_string()]);
    }

    #[test]
    fn non_production_sync_is_a_no_op() {
        let cli = Cli::try_parse_from([
            "docsearch-indexer",
            "sync",
            "--mode",
            "development",
            "--content-dir",
            "does/not/exist",
        ])
        .expect("parse");

        let Command::Sync(args) = cli.command else {
            panic!("expected sync command");
        };
        assert!(run_sync(args).is_ok());
    }

    #[test]
    fn production_sync_without_remote_settings_does_not_fail() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("app/docs")).expect("content dir");

        let args = SyncArgs {
            content: ContentArgs {
                project_root: dir.path().to_path_buf(),
                content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
                extensions: vec![DEFAULT_EXTENSION.to_string()],
            },
            remote: RemoteArgs {
                endpoint: None,
                access_token: None,
                request_timeout: None,
            },
            mode: "production".to_string(),
        };

        assert!(run_sync(args).is_ok());
    }
}
