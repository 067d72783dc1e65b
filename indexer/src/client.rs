use std::fmt;

use anyhow::Context;
use docsearch_indexer_types::{BulkIndexResult, DeleteResult, DocumentInput, FindResult};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::config::RemoteConfig;

const FIND_QUERY: &str = r#"
query FindDocuments($query: String!) {
  find(query: $query) {
    total
    documents {
      id
      data
    }
  }
}
"#;

const FIND_IDS_QUERY: &str = r#"
query FindDocumentIds($query: String!) {
  find(query: $query) {
    total
    documents {
      id
    }
  }
}
"#;

const DELETE_MUTATION: &str = r#"
mutation DeleteDocument($id: ID!) {
  delete(id: $id) {
    code
    message
    success
  }
}
"#;

const BULK_INDEX_MUTATION: &str = r#"
mutation BulkIndex($documents: [DocumentInput!]!) {
  bulkIndex(input: { documents: $documents }) {
    code
    documents {
      id
    }
  }
}
"#;

/// Operations the synchronizer and search command need from the hosted index.
pub trait SearchIndex {
    /// Runs a search returning each hit's id and data.
    fn find(&self, query: &str) -> Result<FindResult, ClientError>;
    /// Runs a search returning ids only.
    fn find_ids(&self, query: &str) -> Result<FindResult, ClientError>;
    fn delete(&self, id: &str) -> Result<DeleteResult, ClientError>;
    fn bulk_index(&self, documents: &[DocumentInput]) -> Result<BulkIndexResult, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Value>,
}

impl fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} (at {})", self.message, path),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode {operation} response: {source}; body: {body}")]
    Decode {
        operation: &'static str,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation} returned GraphQL errors: {}", join_errors(.errors))]
    Graphql {
        operation: &'static str,
        errors: Vec<GraphqlError>,
    },
    #[error("{operation} response contained no data")]
    MissingData { operation: &'static str },
}

fn join_errors(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

/// Decodes a GraphQL response body and extracts `data.<field>`.
fn decode_field<T: DeserializeOwned>(
    operation: &'static str,
    field: &str,
    body: &str,
) -> Result<T, ClientError> {
    let decode_error = |source| ClientError::Decode {
        operation,
        body: body.to_string(),
        source,
    };

    let response: GraphqlResponse = serde_json::from_str(body).map_err(decode_error)?;

    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        return Err(ClientError::Graphql { operation, errors });
    }

    let value = response
        .data
        .and_then(|mut data| data.get_mut(field).map(Value::take))
        .filter(|value| !value.is_null())
        .ok_or(ClientError::MissingData { operation })?;

    serde_json::from_value(value).map_err(decode_error)
}

/// Blocking GraphQL client for the hosted search index.
pub struct GraphqlClient {
    client: Client,
    endpoint: String,
    access_token: String,
}

impl GraphqlClient {
    pub fn new(config: &RemoteConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            access_token: config.access_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn execute<V: Serialize, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        field: &str,
        query: &str,
        variables: V,
    ) -> Result<T, ClientError> {
        debug!(operation, endpoint = %self.endpoint, "sending GraphQL request");

        let response = post_json(
            &self.client,
            &self.endpoint,
            &self.access_token,
            &GraphqlRequest { query, variables },
        )?;

        let body = response.text().map_err(|source| ClientError::Transport {
            url: self.endpoint.clone(),
            source,
        })?;

        decode_field(operation, field, &body)
    }
}

impl SearchIndex for GraphqlClient {
    fn find(&self, query: &str) -> Result<FindResult, ClientError> {
        self.execute("find", "find", FIND_QUERY, json!({ "query": query }))
    }

    fn find_ids(&self, query: &str) -> Result<FindResult, ClientError> {
        self.execute("find", "find", FIND_IDS_QUERY, json!({ "query": query }))
    }

    fn delete(&self, id: &str) -> Result<DeleteResult, ClientError> {
        self.execute("delete", "delete", DELETE_MUTATION, json!({ "id": id }))
    }

    fn bulk_index(&self, documents: &[DocumentInput]) -> Result<BulkIndexResult, ClientError> {
        self.execute(
            "bulkIndex",
            "bulkIndex",
            BULK_INDEX_MUTATION,
            json!({ "documents": documents }),
        )
    }
}

fn post_json<T: Serialize>(
    client: &Client,
    url: &str,
    access_token: &str,
    body: &T,
) -> Result<Response, ClientError> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", access_token))
        .json(body)
        .send()
        .map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        return Err(ClientError::Status {
            url: url.to_string(),
            status,
            body,
        });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_find_results() {
        let body = r#"{"data":{"find":{"total":2,"documents":[{"id":"mdx:/a","data":{"title":"A"}},{"id":"mdx:/b"}]}}}"#;
        let result: FindResult = decode_field("find", "find", body).expect("decode");
        assert_eq!(result.total, Some(2));
        assert_eq!(result.documents.len(), 2);
        assert_eq!(result.documents[0].id, "mdx:/a");
        assert!(result.documents[1].data.is_null());
    }

    #[test]
    fn surfaces_graphql_errors() {
        let body = r#"{"data":null,"errors":[{"message":"Unauthorized","path":["find"]}]}"#;
        let err = decode_field::<FindResult>("find", "find", body).expect_err("should fail");
        match &err {
            ClientError::Graphql { errors, .. } => assert_eq!(errors[0].message, "Unauthorized"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "find returned GraphQL errors: Unauthorized (at [\"find\"])"
        );
    }

    #[test]
    fn treats_empty_error_lists_as_success() {
        let body = r#"{"data":{"delete":{"code":"200","message":"ok","success":true}},"errors":[]}"#;
        let result: DeleteResult = decode_field("delete", "delete", body).expect("decode");
        assert!(result.is_acknowledged());
        assert_eq!(result.message.as_deref(), Some("ok"));
    }

    #[test]
    fn reports_missing_data_and_garbage() {
        let err = decode_field::<DeleteResult>("delete", "delete", r#"{"data":{"delete":null}}"#)
            .expect_err("should fail");
        assert!(matches!(err, ClientError::MissingData { operation: "delete" }));

        let err = decode_field::<DeleteResult>("delete", "delete", "<html>oops</html>")
            .expect_err("should fail");
        assert!(matches!(err, ClientError::Decode { .. }));
        assert!(err.to_string().contains("<html>oops</html>"));
    }

    #[test]
    fn bulk_index_request_matches_wire_shape() {
        let doc = docsearch_indexer_types::Document::mdx(
            "/docs/a".into(),
            "A".into(),
            "body".into(),
        );
        let request = GraphqlRequest {
            query: BULK_INDEX_MUTATION,
            variables: json!({ "documents": [doc.to_input()] }),
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            value["variables"]["documents"][0],
            json!({
                "id": "mdx:/docs/a",
                "data": {
                    "title": "A",
                    "content": "body",
                    "path": "/docs/a",
                    "content_type": "mdx_doc",
                }
            })
        );
    }
}
