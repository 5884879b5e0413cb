// src/wallet/mod.rs
//! Identity sessions and the signatures they produce.

pub mod envelope;
pub mod key_session;
pub mod signer;
pub mod wallet_session;

pub use envelope::{EcdsaSignature, Envelope, EnvelopeError, GeneralJws};
pub use key_session::KeySession;
pub use signer::{Session, Signer, SignerError};
pub use wallet_session::WalletSession;
