// src/models/mod.rs
//! Data structures shared by every layer.

pub mod attestation;
pub mod credential;
pub mod did;
pub mod schema;
