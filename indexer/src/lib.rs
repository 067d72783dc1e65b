pub mod cli;
pub mod client;
pub mod collector;
pub mod config;
pub mod invocation;
pub mod metadata;
pub mod output;
pub mod paths;
pub mod search;
pub mod sync;
pub mod utils;

pub use cli::run;
pub use client::{ClientError, GraphqlClient, SearchIndex};
pub use collector::{Collection, Collector};
pub use config::{IndexerConfig, RemoteConfig};
pub use invocation::{BuildInvocation, BuildMode};
pub use sync::{SyncReport, Synchronizer};
