// src/eip712/types.rs
//! EIP-712 types generation.
//!
//! Derives the EIP-712 `types` map of a credential from the credential's own
//! JSON shape, following the
//! [EthereumEip712Signature2021 types-generation algorithm](https://w3c-ccg.github.io/ethereum-eip712-signature-2021-spec/#types-generation):
//! properties are visited in JCS order, primitives map to `bool`, `uint256`
//! and `string`, homogeneous primitive arrays map to `T[]`, and nested objects
//! become structs named after their property with the first letter
//! upper-cased.

use crate::models::credential::{Eip712Domain, Eip712Info, Eip712Types, MemberVariable};
use serde_json::Value;
use thiserror::Error;

/// Primary type used for credentials.
pub const CREDENTIAL_PRIMARY_TYPE: &str = "VerifiableCredential";

/// Name of the domain struct in every generated `types` map.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// Chain ID embedded in every credential domain.
///
/// Fixed to mainnet rather than taken from the signer's network.
pub const CREDENTIAL_CHAIN_ID: u64 = 1;

#[derive(Error, Debug, PartialEq)]
pub enum TypesGenerationError {
    #[error("Expected object")]
    ExpectedObject,
    #[error("Found empty array under property: {0}")]
    EmptyArray(String),
    #[error("Array inconsistency: expected type {0} under property: {1}")]
    ArrayInconsistency(&'static str, String),
    #[error("Array value must be boolean, number or string. Property: {0}")]
    ComplexArrayValue(String),
    #[error("Value must be boolean, number, string, array or struct. Property: {0}")]
    ComplexValue(String),
}

/// The fixed domain of credential signatures.
pub fn credential_domain() -> Eip712Domain {
    Eip712Domain {
        chain_id: CREDENTIAL_CHAIN_ID,
        name: CREDENTIAL_PRIMARY_TYPE.to_string(),
        version: "1".to_string(),
    }
}

/// Derives `{domain, types, primaryType}` for a credential document.
///
/// # Arguments
/// * `document` - The credential as JSON, without signature material
/// * `primary_type` - Name of the top-level struct
///
/// # Errors
/// Fails on shapes EIP-712 cannot express: empty or mixed arrays, arrays of
/// objects, and `null` values.
pub fn derive_types(document: &Value, primary_type: &str) -> Result<Eip712Info, TypesGenerationError> {
    let mut types = generate_types(document, primary_type)?;
    types.insert(
        DOMAIN_TYPE.to_string(),
        vec![
            MemberVariable::new("name", "string"),
            MemberVariable::new("version", "string"),
            MemberVariable::new("chainId", "uint256"),
        ],
    );
    Ok(Eip712Info {
        domain: credential_domain(),
        types,
        primary_type: primary_type.to_string(),
    })
}

/// Generates the struct types of `document`, without the domain entry.
pub fn generate_types(document: &Value, primary_type: &str) -> Result<Eip712Types, TypesGenerationError> {
    let mut output = Eip712Types::new();
    let mut members = Vec::new();

    let object = document.as_object().ok_or(TypesGenerationError::ExpectedObject)?;
    let mut props: Vec<(&String, &Value)> = object.iter().collect();
    // https://datatracker.ietf.org/doc/html/rfc8785#section-3.2.3
    props.sort_by_cached_key(|(name, _value)| name.encode_utf16().collect::<Vec<u16>>());

    for (property_name, value) in props {
        match value {
            Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                members.push(MemberVariable::new(property_name.as_str(), primitive_type(value)));
            }
            Value::Array(array) => {
                let item_type = array_item_type(property_name, array)?;
                members.push(MemberVariable::new(
                    property_name.as_str(),
                    format!("{}[]", item_type),
                ));
            }
            Value::Object(_) => {
                let struct_name = property_to_struct_name(property_name);
                let mut nested = generate_types(value, &struct_name)?;
                members.push(MemberVariable::new(property_name.as_str(), struct_name.as_str()));
                output.append(&mut nested);
            }
            Value::Null => {
                return Err(TypesGenerationError::ComplexValue(property_name.clone()));
            }
        }
    }

    output.insert(primary_type.to_string(), members);
    Ok(output)
}

fn primitive_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "bool",
        Value::Number(_) => "uint256",
        _ => "string",
    }
}

fn array_item_type(property_name: &str, array: &[Value]) -> Result<&'static str, TypesGenerationError> {
    let mut values = array.iter();
    let first = values
        .next()
        .ok_or_else(|| TypesGenerationError::EmptyArray(property_name.to_string()))?;
    let (item_type, label) = match first {
        Value::Bool(_) => ("bool", "boolean"),
        Value::Number(_) => ("uint256", "number"),
        Value::String(_) => ("string", "string"),
        _ => return Err(TypesGenerationError::ComplexArrayValue(property_name.to_string())),
    };
    for value in values {
        let consistent = matches!(
            (first, value),
            (Value::Bool(_), Value::Bool(_))
                | (Value::Number(_), Value::Number(_))
                | (Value::String(_), Value::String(_))
        );
        if !consistent {
            return Err(TypesGenerationError::ArrayInconsistency(label, property_name.to_string()));
        }
    }
    Ok(item_type)
}

fn property_to_struct_name(property_name: &str) -> String {
    let mut chars = property_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credential() -> Value {
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential", "Trusted"],
            "issuer": "did:key:z6MkIssuer",
            "issuanceDate": "2024-01-01T00:00:00.000Z",
            "credentialSchema": { "id": "https://example.com/schema.json", "type": "JsonSchemaValidator2018" },
            "credentialSubject": { "isTrusted": true, "id": "did:pkh:eip155:1:0xabc" },
            "proof": {
                "type": "EthereumEip712Signature2021",
                "verificationMethod": "did:key:z6MkIssuer",
                "created": "2024-01-01T00:00:00.000Z",
                "proofPurpose": "assertionMethod"
            }
        })
    }

    #[test]
    fn generates_nested_struct_types() {
        let info = derive_types(&credential(), CREDENTIAL_PRIMARY_TYPE).unwrap();
        let expected = json!({
            "CredentialSchema": [
                { "name": "id", "type": "string" },
                { "name": "type", "type": "string" }
            ],
            "CredentialSubject": [
                { "name": "id", "type": "string" },
                { "name": "isTrusted", "type": "bool" }
            ],
            "EIP712Domain": [
                { "name": "name", "type": "string" },
                { "name": "version", "type": "string" },
                { "name": "chainId", "type": "uint256" }
            ],
            "Proof": [
                { "name": "created", "type": "string" },
                { "name": "proofPurpose", "type": "string" },
                { "name": "type", "type": "string" },
                { "name": "verificationMethod", "type": "string" }
            ],
            "VerifiableCredential": [
                { "name": "@context", "type": "string[]" },
                { "name": "credentialSchema", "type": "CredentialSchema" },
                { "name": "credentialSubject", "type": "CredentialSubject" },
                { "name": "issuanceDate", "type": "string" },
                { "name": "issuer", "type": "string" },
                { "name": "proof", "type": "Proof" },
                { "name": "type", "type": "string[]" }
            ]
        });
        assert_eq!(serde_json::to_value(&info.types).unwrap(), expected);
        assert_eq!(info.primary_type, "VerifiableCredential");
    }

    #[test]
    fn domain_is_fixed_to_mainnet() {
        let info = derive_types(&credential(), CREDENTIAL_PRIMARY_TYPE).unwrap();
        assert_eq!(
            serde_json::to_value(&info.domain).unwrap(),
            json!({ "chainId": 1, "name": "VerifiableCredential", "version": "1" })
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let first = serde_json::to_string(&derive_types(&credential(), "VerifiableCredential").unwrap()).unwrap();
        for _ in 0..8 {
            let again = serde_json::to_string(&derive_types(&credential(), "VerifiableCredential").unwrap()).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn numbers_map_to_uint256() {
        let types = generate_types(&json!({ "time": 1700000000, "flags": [1, 2] }), "Doc").unwrap();
        assert_eq!(
            types["Doc"],
            vec![
                MemberVariable::new("flags", "uint256[]"),
                MemberVariable::new("time", "uint256"),
            ]
        );
    }

    #[test]
    fn rejects_unexpressible_shapes() {
        assert_eq!(
            generate_types(&json!({ "a": [] }), "Doc").unwrap_err(),
            TypesGenerationError::EmptyArray("a".into())
        );
        assert_eq!(
            generate_types(&json!({ "a": [true, "x"] }), "Doc").unwrap_err(),
            TypesGenerationError::ArrayInconsistency("boolean", "a".into())
        );
        assert_eq!(
            generate_types(&json!({ "a": [{ "b": 1 }] }), "Doc").unwrap_err(),
            TypesGenerationError::ComplexArrayValue("a".into())
        );
        assert_eq!(
            generate_types(&json!({ "a": null }), "Doc").unwrap_err(),
            TypesGenerationError::ComplexValue("a".into())
        );
        assert_eq!(
            generate_types(&json!(["not", "an", "object"]), "Doc").unwrap_err(),
            TypesGenerationError::ExpectedObject
        );
    }

    #[test]
    fn struct_names_capitalise_first_letter() {
        assert_eq!(property_to_struct_name("credentialSubject"), "CredentialSubject");
        assert_eq!(property_to_struct_name("proof"), "Proof");
        assert_eq!(property_to_struct_name(""), "");
    }
}
