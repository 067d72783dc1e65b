use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use docsearch_indexer_types::Document;
use ignore::WalkBuilder;
use tracing::{debug, info, trace, warn};

use crate::config::IndexerConfig;
use crate::metadata;
use crate::paths;
use crate::utils;

/// Outcome of one walk over the content directory.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedFile>,
}

impl Collection {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|doc| doc.id.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct Collector {
    config: IndexerConfig,
}

impl Collector {
    pub fn new(config: IndexerConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<Collection> {
        let root = &self.config.content_dir;
        if !root.is_dir() {
            bail!("content directory {} does not exist", root.display());
        }

        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut collection = Collection::default();
        let mut seen_ids: HashMap<String, PathBuf> = HashMap::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "failed to read directory entry");
                    continue;
                }
            };

            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                trace!(path = %entry.path().display(), "skipping non-file entry");
                continue;
            }

            if !utils::has_extension(entry.path(), &self.config.extensions) {
                trace!(path = %entry.path().display(), "skipping file with unrecognized extension");
                continue;
            }

            let absolute = entry.path();
            let document = match self.process_file(absolute) {
                Ok(document) => document,
                Err(err) => {
                    warn!(
                        path = %absolute.display(),
                        error = %format!("{err:#}"),
                        "skipping content file"
                    );
                    collection.skipped.push(SkippedFile {
                        path: absolute.to_path_buf(),
                        reason: format!("{err:#}"),
                    });
                    continue;
                }
            };

            if let Some(first) = seen_ids.get(&document.id) {
                warn!(
                    id = %document.id,
                    path = %absolute.display(),
                    first = %first.display(),
                    "skipping content file whose route collides with an earlier file"
                );
                collection.skipped.push(SkippedFile {
                    path: absolute.to_path_buf(),
                    reason: format!("duplicate id {} (first seen in {})", document.id, first.display()),
                });
                continue;
            }

            info!(id = %document.id, path = %document.path, "collected document");
            seen_ids.insert(document.id.clone(), absolute.to_path_buf());
            collection.documents.push(document);
        }

        debug!(
            documents = collection.documents.len(),
            skipped = collection.skipped.len(),
            root = %root.display(),
            "content walk finished"
        );

        Ok(collection)
    }

    fn process_file(&self, absolute: &Path) -> Result<Document> {
        let content = fs::read_to_string(absolute)
            .with_context(|| format!("failed to read {}", absolute.display()))?;

        let metadata = metadata::extract_metadata(&content)
            .with_context(|| format!("invalid metadata in {}", absolute.display()))?;

        let relative = utils::ensure_relative(absolute, &self.config.project_root)?;
        let relative = utils::normalize_relative_path(&relative);
        let canonical = paths::canonical_path(&relative, &self.config.extensions);

        Ok(Document::mdx(canonical, metadata.title, content))
    }
}
