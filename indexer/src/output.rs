use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docsearch_indexer_types::Document;

pub const DOCUMENTS_FILE: &str = "documents.json";

/// Writes the collected documents, in the shape submitted to the index, to
/// `documents.json` under `output_dir`.
pub fn write_documents(output_dir: &Path, documents: &[Document]) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    let path = output_dir.join(DOCUMENTS_FILE);
    write_array_file(&path, |writer| {
        for (idx, document) in documents.iter().enumerate() {
            if idx > 0 {
                writer.write_all(b",")?;
            }
            serde_json::to_writer(&mut *writer, &document.to_input())?;
        }
        Ok(())
    })?;

    Ok(path)
}

fn write_array_file<F>(path: impl AsRef<Path>, mut write_fn: F) -> Result<()>
where
    F: FnMut(&mut dyn Write) -> Result<()>,
{
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writer
        .write_all(b"[")
        .with_context(|| format!("failed to start {}", path.display()))?;
    write_fn(&mut writer)
        .with_context(|| format!("failed to write {}", path.display()))?;
    writer
        .write_all(b"]")
        .with_context(|| format!("failed to finalize {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsearch_indexer_types::DocumentInput;
    use tempfile::TempDir;

    #[test]
    fn writes_documents_as_json_array() {
        let dir = TempDir::new().expect("tempdir");
        let documents = vec![
            Document::mdx("/docs/a".into(), "A".into(), "a".into()),
            Document::mdx("/docs/b".into(), "B".into(), "b".into()),
        ];

        let path = write_documents(&dir.path().join("out"), &documents).expect("write");

        let raw = fs::read_to_string(path).expect("read");
        let parsed: Vec<DocumentInput> = serde_json::from_str(&raw).expect("parse");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].id, "mdx:/docs/b");
        assert_eq!(parsed[1].data.path, "/docs/b");
    }

    #[test]
    fn writes_empty_array_for_no_documents() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_documents(dir.path(), &[]).expect("write");
        assert_eq!(fs::read_to_string(path).expect("read"), "[]");
    }
}
