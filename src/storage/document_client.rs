// src/storage/document_client.rs
//! Client for the remote document database.
//!
//! The remote service exposes a single GraphQL entry point,
//! `executeQuery(string) -> {data, errors}`, used for both create mutations
//! and read queries. Documents are public and append-only: every accepted
//! mutation creates a new document.
//!
//! # Features
//! - [`DocumentService`] seam so the transport can be swapped in tests
//! - [`GraphQlClient`] HTTP implementation on `reqwest`
//! - [`SubmissionClient`] that turns a response into a [`RemoteDocument`]
//!
//! Neither submissions nor queries are retried.

use crate::graphql::Mutation;
use crate::wallet::Session;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The remote service answered with GraphQL errors, relayed verbatim.
    #[error("remote service rejected the request: {}", Value::Array(.0.clone()))]
    Rejected(Vec<Value>),
    #[error("response has no `{0}.document`")]
    MissingDocument(String),
}

/// `{data, errors}` as returned by `executeQuery`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
}

impl QueryResponse {
    pub fn with_data(data: Value) -> Self {
        QueryResponse {
            data: Some(data),
            errors: None,
        }
    }

    pub fn with_errors(errors: Vec<Value>) -> Self {
        QueryResponse {
            data: None,
            errors: Some(errors),
        }
    }

    /// The error list, when non-empty.
    pub fn errors(&self) -> Option<&[Value]> {
        self.errors.as_deref().filter(|errors| !errors.is_empty())
    }
}

/// A document the remote service created.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    /// `data.<mutation>.document`.
    pub document: Value,
    /// The untouched `{data}` response.
    pub response: Value,
}

impl RemoteDocument {
    /// Stream id assigned by the remote service, if selected.
    pub fn id(&self) -> Option<&str> {
        self.document.get("id").and_then(Value::as_str)
    }
}

/// The remote document service's GraphQL entry point.
#[async_trait]
pub trait DocumentService: Send + Sync {
    async fn execute_query(&self, query: &str) -> Result<QueryResponse, ServiceError>;
}

/// HTTP implementation posting `{query}` to `{base}/graphql`.
#[derive(Clone)]
pub struct GraphQlClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GraphQlClient {
    /// Creates a client for the service at `base_url` (e.g. `http://localhost:7007`).
    pub fn new(base_url: &str) -> Self {
        GraphQlClient {
            client: reqwest::Client::new(),
            endpoint: format!("{}/graphql", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DocumentService for GraphQlClient {
    async fn execute_query(&self, query: &str) -> Result<QueryResponse, ServiceError> {
        debug!("POST {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query }))
            .send()
            .await?
            .json::<QueryResponse>()
            .await?;
        Ok(response)
    }
}

/// Sends mutations and queries through a shared [`DocumentService`].
#[derive(Clone)]
pub struct SubmissionClient {
    service: Arc<dyn DocumentService>,
}

impl SubmissionClient {
    pub fn new(service: Arc<dyn DocumentService>) -> Self {
        SubmissionClient { service }
    }

    /// Submits a create mutation on behalf of `session`.
    ///
    /// # Arguments
    /// * `session` - Authenticated session the write is attributed to
    /// * `mutation` - Formatted create mutation
    ///
    /// # Returns
    /// The created document, or:
    /// - `Rejected` with the remote errors, verbatim
    /// - `Transport` if the service could not be reached
    pub async fn submit(&self, session: &Session, mutation: &Mutation) -> Result<RemoteDocument, ServiceError> {
        info!("Submitting {} as {}", mutation.field(), session.did());
        let response = self.service.execute_query(&mutation.to_string()).await?;
        if let Some(errors) = response.errors() {
            warn!("{} rejected: {}", mutation.field(), Value::Array(errors.to_vec()));
            return Err(ServiceError::Rejected(errors.to_vec()));
        }
        let data = response.data.unwrap_or(Value::Null);
        let document = data
            .get(mutation.field())
            .and_then(|created| created.get("document"))
            .cloned()
            .ok_or_else(|| ServiceError::MissingDocument(mutation.field().to_string()))?;
        Ok(RemoteDocument {
            document,
            response: json!({ "data": data }),
        })
    }

    /// Runs a read query, returning the raw response.
    pub async fn query(&self, query: &str) -> Result<QueryResponse, ServiceError> {
        self.service.execute_query(query).await
    }
}
