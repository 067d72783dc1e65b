use std::collections::HashSet;

use docsearch_indexer_types::{ContentType, Document, DocumentInput, IndexedDocument};
use tracing::{error, info, warn};

use crate::client::SearchIndex;
use crate::paths;

/// Summary of one reconciliation run. Failures are recorded, never raised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Number of tagged entries found remotely; `None` when the query failed.
    pub existing: Option<usize>,
    pub deleted: Vec<String>,
    pub failed_deletes: Vec<String>,
    /// Number of documents submitted in the bulk call, when it succeeded.
    pub upserted: Option<usize>,
    pub upsert_error: Option<String>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.existing.is_some() && self.failed_deletes.is_empty() && self.upsert_error.is_none()
    }
}

/// Reconciles the index entries tagged with one content type against a
/// freshly collected set of documents: query, delete stale, bulk upsert.
pub struct Synchronizer<'a, I: ?Sized> {
    index: &'a I,
    content_type: ContentType,
}

impl<'a, I: SearchIndex + ?Sized> Synchronizer<'a, I> {
    pub fn new(index: &'a I) -> Self {
        Self {
            index,
            content_type: ContentType::MdxDoc,
        }
    }

    pub fn query(&self) -> String {
        format!("content_type:\"{}\"", self.content_type)
    }

    pub fn run(&self, documents: &[Document]) -> SyncReport {
        let mut report = SyncReport::default();
        let query = self.query();

        info!(documents = documents.len(), %query, "synchronizing search index");

        match self.index.find_ids(&query) {
            Ok(found) => {
                report.existing = Some(found.documents.len());
                if let Some(total) = found.total.filter(|total| *total as usize > found.documents.len()) {
                    warn!(
                        total,
                        returned = found.documents.len(),
                        "index returned a partial result set; only returned entries are reconciled"
                    );
                }
                self.delete_stale(&found.documents, documents, &mut report);
            }
            Err(err) => {
                error!(error = %err, "failed to query existing documents; skipping deletion");
            }
        }

        self.bulk_upsert(documents, &mut report);

        info!(
            existing = ?report.existing,
            deleted = report.deleted.len(),
            failed_deletes = report.failed_deletes.len(),
            upserted = ?report.upserted,
            "search index synchronization finished"
        );

        report
    }

    fn delete_stale(
        &self,
        existing: &[IndexedDocument],
        documents: &[Document],
        report: &mut SyncReport,
    ) {
        let stale = stale_ids(existing, documents);
        if stale.is_empty() {
            info!("no stale documents to delete");
            return;
        }

        for id in stale {
            match self.index.delete(&id) {
                Ok(result) if result.is_acknowledged() => {
                    info!(%id, code = ?result.code, message = ?result.message, "deleted stale document");
                    report.deleted.push(id);
                }
                Ok(result) => {
                    warn!(
                        %id,
                        code = ?result.code,
                        message = ?result.message,
                        "delete was not acknowledged"
                    );
                    report.failed_deletes.push(id);
                }
                Err(err) => {
                    error!(%id, error = %err, "failed to delete stale document");
                    report.failed_deletes.push(id);
                }
            }
        }
    }

    fn bulk_upsert(&self, documents: &[Document], report: &mut SyncReport) {
        if documents.is_empty() {
            warn!("no documents found for indexing; skipping bulk upsert");
            return;
        }

        let payload = upsert_payload(documents);
        info!(count = payload.len(), "submitting bulk index request");

        match self.index.bulk_index(&payload) {
            Ok(result) => {
                if result.documents.len() != payload.len() {
                    warn!(
                        submitted = payload.len(),
                        acknowledged = result.documents.len(),
                        "bulk index acknowledged a different number of documents"
                    );
                }
                info!(
                    count = payload.len(),
                    code = ?result.code,
                    "indexed documents successfully"
                );
                report.upserted = Some(payload.len());
            }
            Err(err) => {
                error!(error = %err, count = payload.len(), "bulk indexing failed");
                report.upsert_error = Some(err.to_string());
            }
        }
    }
}

/// Ids present remotely but absent from the new collection, each at most once,
/// in the order the index returned them.
pub fn stale_ids(existing: &[IndexedDocument], documents: &[Document]) -> Vec<String> {
    let keep: HashSet<&str> = documents.iter().map(|doc| doc.id.as_str()).collect();
    let mut seen = HashSet::new();

    existing
        .iter()
        .map(|entry| entry.id.as_str())
        .filter(|id| !keep.contains(id) && seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Builds the `bulkIndex` payload, mapping each stored path onto the route the
/// index links to.
pub fn upsert_payload(documents: &[Document]) -> Vec<DocumentInput> {
    documents
        .iter()
        .map(|doc| {
            let mut input = doc.to_input();
            input.data.path = paths::upsert_path(&doc.path);
            input
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use docsearch_indexer_types::{BulkIndexResult, DeleteResult, DocumentRef, FindResult};
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeIndex {
        existing: Vec<String>,
        fail_find: bool,
        reject_delete: Option<String>,
        fail_bulk: bool,
        deletes: RefCell<Vec<String>>,
        bulks: RefCell<Vec<Vec<DocumentInput>>>,
    }

    fn unavailable() -> ClientError {
        ClientError::Status {
            url: "https://search.test/graphql".into(),
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "down".into(),
        }
    }

    impl SearchIndex for FakeIndex {
        fn find(&self, query: &str) -> Result<FindResult, ClientError> {
            self.find_ids(query)
        }

        fn find_ids(&self, _query: &str) -> Result<FindResult, ClientError> {
            if self.fail_find {
                return Err(unavailable());
            }
            Ok(FindResult {
                total: Some(self.existing.len() as u64),
                documents: self
                    .existing
                    .iter()
                    .map(|id| IndexedDocument {
                        id: id.clone(),
                        data: serde_json::Value::Null,
                    })
                    .collect(),
            })
        }

        fn delete(&self, id: &str) -> Result<DeleteResult, ClientError> {
            self.deletes.borrow_mut().push(id.to_string());
            if self.reject_delete.as_deref() == Some(id) {
                return Err(unavailable());
            }
            Ok(DeleteResult {
                code: None,
                message: Some("deleted".into()),
                success: Some(true),
            })
        }

        fn bulk_index(&self, documents: &[DocumentInput]) -> Result<BulkIndexResult, ClientError> {
            self.bulks.borrow_mut().push(documents.to_vec());
            if self.fail_bulk {
                return Err(unavailable());
            }
            Ok(BulkIndexResult {
                code: None,
                documents: documents
                    .iter()
                    .map(|doc| DocumentRef { id: doc.id.clone() })
                    .collect(),
            })
        }
    }

    fn doc(route: &str) -> Document {
        Document::mdx(route.to_string(), format!("Title {route}"), "body".into())
    }

    fn ids(docs: &[DocumentInput]) -> Vec<&str> {
        docs.iter().map(|doc| doc.id.as_str()).collect()
    }

    #[test]
    fn deletes_only_ids_missing_from_the_new_collection() {
        let index = FakeIndex {
            existing: vec!["mdx:/a".into(), "mdx:/b".into(), "mdx:/c".into()],
            ..Default::default()
        };
        let documents = vec![doc("/b"), doc("/c"), doc("/d")];

        let report = Synchronizer::new(&index).run(&documents);

        assert_eq!(*index.deletes.borrow(), vec!["mdx:/a".to_string()]);
        let bulks = index.bulks.borrow();
        assert_eq!(bulks.len(), 1);
        assert_eq!(ids(&bulks[0]), vec!["mdx:/b", "mdx:/c", "mdx:/d"]);
        assert_eq!(report.existing, Some(3));
        assert_eq!(report.deleted, vec!["mdx:/a".to_string()]);
        assert_eq!(report.upserted, Some(3));
        assert!(report.is_clean());
    }

    #[test]
    fn upsert_submits_directory_style_paths() {
        let payload = upsert_payload(&[doc("/docs/test/page")]);
        assert_eq!(payload[0].data.path, "/docs/test/");
        assert_eq!(payload[0].id, "mdx:/docs/test/page");
    }

    #[test]
    fn failed_query_still_attempts_upsert() {
        let index = FakeIndex {
            existing: vec!["mdx:/stale".into()],
            fail_find: true,
            ..Default::default()
        };

        let report = Synchronizer::new(&index).run(&[doc("/a")]);

        assert!(index.deletes.borrow().is_empty());
        assert_eq!(index.bulks.borrow().len(), 1);
        assert_eq!(report.existing, None);
        assert_eq!(report.upserted, Some(1));
        assert!(!report.is_clean());
    }

    #[test]
    fn delete_failures_do_not_stop_the_loop() {
        let index = FakeIndex {
            existing: vec!["mdx:/x".into(), "mdx:/y".into(), "mdx:/z".into()],
            reject_delete: Some("mdx:/y".into()),
            ..Default::default()
        };

        let report = Synchronizer::new(&index).run(&[doc("/a")]);

        assert_eq!(index.deletes.borrow().len(), 3);
        assert_eq!(report.deleted, vec!["mdx:/x".to_string(), "mdx:/z".to_string()]);
        assert_eq!(report.failed_deletes, vec!["mdx:/y".to_string()]);
        assert_eq!(report.upserted, Some(1));
    }

    #[test]
    fn bulk_failure_is_recorded() {
        let index = FakeIndex {
            fail_bulk: true,
            ..Default::default()
        };

        let report = Synchronizer::new(&index).run(&[doc("/a")]);

        assert_eq!(report.upserted, None);
        let message = report.upsert_error.expect("upsert error");
        assert!(message.contains("503"));
    }

    #[test]
    fn empty_collection_deletes_everything_and_skips_upsert() {
        let index = FakeIndex {
            existing: vec!["mdx:/a".into()],
            ..Default::default()
        };

        let report = Synchronizer::new(&index).run(&[]);

        assert_eq!(report.deleted, vec!["mdx:/a".to_string()]);
        assert!(index.bulks.borrow().is_empty());
        assert_eq!(report.upserted, None);
    }

    #[test]
    fn stale_ids_are_deduplicated() {
        let existing: Vec<IndexedDocument> = ["mdx:/a", "mdx:/a", "mdx:/b"]
            .iter()
            .map(|id| IndexedDocument {
                id: id.to_string(),
                data: serde_json::Value::Null,
            })
            .collect();
        assert_eq!(stale_ids(&existing, &[doc("/b")]), vec!["mdx:/a".to_string()]);
    }

    #[test]
    fn queries_by_content_type_tag() {
        let index = FakeIndex::default();
        assert_eq!(Synchronizer::new(&index).query(), "content_type:\"mdx_doc\"");
    }
}
