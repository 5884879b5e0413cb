// src/services/mod.rs
//! Claim creation, query and HTTP services.

pub mod api_server;
pub mod claim_pipeline;
pub mod credential_builder;
pub mod query_console;

pub use api_server::ApiServer;
pub use claim_pipeline::{ClaimError, ClaimOutcome, ClaimPipeline, ClaimRequest};
pub use query_console::{PresetQuery, QueryConsole};
