use std::collections::HashSet;
use std::fmt;

use docsearch_indexer_types::{ContentType, IndexedDocument};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::{ClientError, SearchIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    MdxDoc,
    Post,
}

impl fmt::Display for HitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitKind::MdxDoc => f.write_str("mdx_doc"),
            HitKind::Post => f.write_str("post"),
        }
    }
}

/// A search result reduced to what a results list links to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: HitKind,
}

pub fn search<I: SearchIndex + ?Sized>(index: &I, query: &str) -> Result<Vec<SearchHit>, ClientError> {
    let found = index.find(query)?;
    Ok(format_hits(&found.documents))
}

/// Maps raw index entries to hits. Entries of unknown kind or lacking the
/// fields needed to link to them are dropped; repeated ids keep the first hit.
pub fn format_hits(documents: &[IndexedDocument]) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    documents
        .iter()
        .filter_map(to_hit)
        .filter(|hit| seen.insert(hit.id.clone()))
        .collect()
}

fn to_hit(document: &IndexedDocument) -> Option<SearchHit> {
    let data = document.data_object()?;
    let content_type = string_field(&data, "content_type")
        .or_else(|| string_field(&data, "post_type"))
        .map(ContentType::from)
        .unwrap_or(ContentType::MdxDoc);

    if content_type == ContentType::MdxDoc {
        let title = string_field(&data, "title")?;
        let path = string_field(&data, "path")
            .map(clean_result_path)
            .unwrap_or_else(|| "/".to_string());
        return Some(SearchHit {
            id: document.id.clone(),
            title: title.to_string(),
            path,
            kind: HitKind::MdxDoc,
        });
    }

    if content_type.is_post() {
        let title = string_field(&data, "post_title")?;
        let slug = string_field(&data, "post_name")?;
        return Some(SearchHit {
            id: document.id.clone(),
            title: title.to_string(),
            path: format!("/blog/{slug}"),
            kind: HitKind::Post,
        });
    }

    None
}

fn string_field<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

/// Turns a stored document path into a site route.
pub fn clean_result_path(path: &str) -> String {
    let mut cleaned = path;
    for prefix in ["src/pages", "pages"] {
        let unrooted = cleaned.strip_prefix('/').unwrap_or(cleaned);
        if let Some(rest) = unrooted.strip_prefix(prefix) {
            cleaned = rest;
        }
    }

    let cleaned = cleaned.strip_suffix("/index.mdx").unwrap_or(cleaned);
    let cleaned = cleaned.strip_suffix(".mdx").unwrap_or(cleaned);

    if cleaned.is_empty() {
        "/".to_string()
    } else {
        cleaned.to_string()
    }
}
