use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Prefix shared by the ids of every locally collected documentation page.
pub const MDX_ID_PREFIX: &str = "mdx:";

/// Provenance tag stored as `content_type` on every entry of the shared index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    MdxDoc,
    WpPost,
    Post,
    Other(String),
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            ContentType::MdxDoc => "mdx_doc",
            ContentType::WpPost => "wp_post",
            ContentType::Post => "post",
            ContentType::Other(tag) => tag,
        }
    }

    pub fn is_post(&self) -> bool {
        matches!(self, ContentType::WpPost | ContentType::Post)
    }
}

impl From<&str> for ContentType {
    fn from(tag: &str) -> Self {
        match tag {
            "mdx_doc" => ContentType::MdxDoc,
            "wp_post" => ContentType::WpPost,
            "post" => ContentType::Post,
            other => ContentType::Other(other.to_string()),
        }
    }
}

impl From<String> for ContentType {
    fn from(tag: String) -> Self {
        ContentType::from(tag.as_str())
    }
}

impl From<ContentType> for String {
    fn from(tag: ContentType) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page collected from disk, ready to be submitted to the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub path: String,
    pub content_type: ContentType,
}

impl Document {
    pub fn mdx(canonical_path: String, title: String, content: String) -> Self {
        Self {
            id: format!("{MDX_ID_PREFIX}{canonical_path}"),
            title,
            content,
            path: canonical_path,
            content_type: ContentType::MdxDoc,
        }
    }

    pub fn to_input(&self) -> DocumentInput {
        DocumentInput {
            id: self.id.clone(),
            data: DocumentData {
                title: self.title.clone(),
                content: self.content.clone(),
                path: self.path.clone(),
                content_type: self.content_type.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentData {
    pub title: String,
    pub content: String,
    pub path: String,
    pub content_type: ContentType,
}

/// Wire shape of one entry in a `bulkIndex` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInput {
    pub id: String,
    pub data: DocumentData,
}

/// An entry as returned by `find`. `data` is owned by the search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    #[serde(default)]
    pub data: Value,
}

impl IndexedDocument {
    /// Returns `data` as a JSON object. The service returns either an object
    /// or a JSON encoded string depending on the query.
    pub fn data_object(&self) -> Option<serde_json::Map<String, Value>> {
        match &self.data {
            Value::Object(map) => Some(map.clone()),
            Value::String(raw) => match serde_json::from_str(raw) {
                Ok(Value::Object(map)) => Some(map),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindResult {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<IndexedDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
}

impl DeleteResult {
    /// Only an explicit `success: false` counts as a rejected delete.
    pub fn is_acknowledged(&self) -> bool {
        self.success != Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkIndexResult {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<DocumentRef>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
