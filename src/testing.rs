// src/testing.rs
//! Test doubles for the remote document service.

use crate::storage::{DocumentService, QueryResponse, ServiceError};
use crate::wallet::{KeySession, Session};
use async_trait::async_trait;
use axum::{extract::State, routing::post, Json, Router};
use graphql_parser::query::{Definition, OperationDefinition, Selection, Value as AstValue};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// RFC 8032 test vector 1 seed.
pub const TEST_SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

pub fn test_session() -> Session {
    Session::new(KeySession::from_hex_seed(TEST_SEED).unwrap())
}

/// Append-only store that understands the create mutations this crate emits
/// and the latest-base-trust query.
#[derive(Default)]
pub struct InMemoryDocumentService {
    documents: Mutex<Vec<(String, Value)>>,
    queries: AtomicUsize,
}

impl InMemoryDocumentService {
    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    /// Number of calls to `execute_query`, reads and writes.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn create(&self, query: &str) -> QueryResponse {
        let (field, content) = parse_mutation(query);
        let mut documents = self.documents.lock().unwrap();
        let document = stored_document(content, format!("kjzl{:04}", documents.len() + 1));
        documents.push((field.clone(), document.clone()));
        QueryResponse::with_data(json!({ field: { "document": document } }))
    }

    fn latest(&self, mutation: &str) -> Option<Value> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(field, _)| field == mutation)
            .map(|(_, document)| document.clone())
    }
}

#[async_trait]
impl DocumentService for InMemoryDocumentService {
    async fn execute_query(&self, query: &str) -> Result<QueryResponse, ServiceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if query.starts_with("mutation") {
            return Ok(self.create(query));
        }
        if query.contains("trustIndex(last: 1)") {
            let edges: Vec<Value> = self
                .latest("createTrust")
                .map(|node| json!({ "node": node }))
                .into_iter()
                .collect();
            return Ok(QueryResponse::with_data(json!({ "trustIndex": { "edges": edges } })));
        }
        Ok(QueryResponse::with_data(json!({})))
    }
}

/// Rejects every request with the given errors.
pub struct RejectingService(pub Vec<Value>);

#[async_trait]
impl DocumentService for RejectingService {
    async fn execute_query(&self, _query: &str) -> Result<QueryResponse, ServiceError> {
        Ok(QueryResponse::with_errors(self.0.clone()))
    }
}

/// Answers every request with the same response.
pub struct StaticService(pub QueryResponse);

#[async_trait]
impl DocumentService for StaticService {
    async fn execute_query(&self, _query: &str) -> Result<QueryResponse, ServiceError> {
        Ok(self.0.clone())
    }
}

/// Parses a create mutation into its field name and `input.content` as JSON.
pub fn parse_mutation(query: &str) -> (String, Value) {
    let document = graphql_parser::parse_query::<String>(query).unwrap();
    let Some(Definition::Operation(OperationDefinition::Mutation(mutation))) = document.definitions.first() else {
        panic!("not a mutation: {}", query);
    };
    let Some(Selection::Field(create)) = mutation.selection_set.items.first() else {
        panic!("mutation has no field");
    };
    let (_, input) = create
        .arguments
        .iter()
        .find(|(name, _)| name == "input")
        .unwrap();
    let AstValue::Object(input) = input else {
        panic!("input is not an object");
    };
    (create.name.clone(), ast_to_json(&input["content"]))
}

/// Parses a standalone input literal as JSON.
pub fn literal_to_json(literal: &str) -> Value {
    let query = format!("{{ f(v: {}) }}", literal);
    let document = graphql_parser::parse_query::<String>(&query).unwrap();
    let Some(Definition::Operation(OperationDefinition::SelectionSet(set))) = document.definitions.first() else {
        panic!("unexpected document");
    };
    let Some(Selection::Field(field)) = set.items.first() else {
        panic!("no field");
    };
    ast_to_json(&field.arguments[0].1)
}

fn ast_to_json(value: &AstValue<'_, String>) -> Value {
    match value {
        AstValue::Int(n) => json!(n.as_i64().unwrap()),
        AstValue::Float(x) => json!(x),
        AstValue::String(s) => json!(s),
        AstValue::Boolean(b) => json!(b),
        AstValue::Null => Value::Null,
        AstValue::Enum(e) => json!(e),
        AstValue::List(items) => Value::Array(items.iter().map(ast_to_json).collect()),
        AstValue::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), ast_to_json(value)))
                .collect(),
        ),
        AstValue::Variable(name) => panic!("unexpected variable ${}", name),
    }
}

/// Request bodies received by a [`GraphQlStub`].
pub type Received = Arc<Mutex<Vec<Value>>>;

/// A local HTTP server answering `POST /graphql` with a fixed body.
pub struct GraphQlStub {
    pub base_url: String,
    pub received: Received,
}

impl GraphQlStub {
    pub async fn spawn(response: Value) -> Self {
        let received: Received = Arc::default();
        let app = Router::new()
            .route(
                "/graphql",
                post(|State((received, response)): State<(Received, Value)>, Json(body): Json<Value>| async move {
                    received.lock().unwrap().push(body);
                    Json(response)
                }),
            )
            .with_state((received.clone(), response));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        GraphQlStub {
            base_url: format!("http://{}", addr),
            received,
        }
    }

    pub fn requests(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }
}

/// Resolves DID fields into `{id}` references, as the remote service does.
fn stored_document(content: Value, id: String) -> Value {
    let mut document = Map::new();
    document.insert("id".into(), Value::String(id));
    let Value::Object(content) = content else {
        panic!("content must be an object");
    };
    for (key, mut value) in content {
        match key.as_str() {
            "recipient" | "attester" => value = json!({ "id": value }),
            "credentialSubject" => {
                if let Some(subject_id) = value.get_mut("id") {
                    *subject_id = json!({ "id": subject_id.take() });
                }
            }
            _ => {}
        }
        document.insert(key, value);
    }
    Value::Object(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_content_is_read_from_the_document() {
        let query = r#"mutation { createTrust(input: { content: {recipient: "}{", trusted: true, n: 2} }) { document { id } } }"#;
        let (field, content) = parse_mutation(query);
        assert_eq!(field, "createTrust");
        assert_eq!(content, json!({ "recipient": "}{", "trusted": true, "n": 2 }));
    }

    #[test]
    fn standalone_literals_parse() {
        assert_eq!(literal_to_json(r#"{a: "x: y", b: [true, 1]}"#), json!({ "a": "x: y", "b": [true, 1] }));
    }
}
