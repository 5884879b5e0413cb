// src/utils/crypto.rs
//! Cryptographic utilities optimized for Ethereum compatibility.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) for hashing, address
//! derivation and EIP-191 message prefixing.

use ethers::types::Address;
use ethers::utils::keccak256;
use k256::PublicKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Derives the Ethereum address of a secp256k1 public key.
///
/// The address is the last 20 bytes of the Keccak-256 hash of the
/// uncompressed SEC1 point without its `0x04` prefix.
pub fn eth_address(public_key: &PublicKey) -> Address {
    let point = public_key.to_encoded_point(false);
    let hash = hash_data(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Formats an address as lowercase hex with a `0x` prefix.
pub fn format_address(address: &Address) -> String {
    format!("0x{:x}", address)
}

/// Hashes a message with the EIP-191 `personal_sign` prefix.
pub fn hash_personal_message(message: &[u8]) -> [u8; 32] {
    let mut prefixed = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    prefixed.extend_from_slice(message);
    hash_data(&prefixed)
}
