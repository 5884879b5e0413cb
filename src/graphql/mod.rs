// src/graphql/mod.rs
//! GraphQL request building for the remote document service.

pub mod mutation;
pub mod selection;
pub mod value;

pub use mutation::{FormatError, Mutation};
pub use value::{GqlValue, LiteralError};
