// src/storage/mod.rs
//! Persistence through the remote document database.

pub mod document_client;

pub use document_client::{
    DocumentService, GraphQlClient, QueryResponse, RemoteDocument, ServiceError, SubmissionClient,
};
