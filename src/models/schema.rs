// src/models/schema.rs
//! Schema registry.
//!
//! Static descriptions of every claim variant this system can produce: the
//! JSON-LD contexts and types a credential carries, the credential schema it
//! points at, the proof type tag, and the mutation/response shape the remote
//! document service expects for it. Also holds the EAS chain configuration
//! used by off-chain attestations.

use crate::graphql::selection::{field, members, object, reference, Selection};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Baseline JSON-LD context every verifiable credential starts with.
pub const MANDATORY_CREDENTIAL_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Baseline credential type every verifiable credential starts with.
pub const MANDATORY_CREDENTIAL_TYPE: &str = "VerifiableCredential";

pub const TRUSTED_REVIEWER_CONTEXT: &str =
    "https://beta.api.schemas.serto.id/v1/public/trusted-reviewer/1.0/ld-context.json";

pub const TRUSTED_JSON_SCHEMA: &str =
    "https://beta.api.schemas.serto.id/v1/public/trusted/1.0/json-schema.json";

pub const JSON_SCHEMA_VALIDATOR: &str = "JsonSchemaValidator2018";

pub const EIP712_PROOF_TYPE: &str = "EthereumEip712Signature2021";
pub const JWT_PROOF_TYPE: &str = "JwtProof2020";
pub const PROOF_PURPOSE: &str = "assertionMethod";

/// EAS schema UID of the `bool trusted` schema.
pub const TRUST_SCHEMA_UID: &str =
    "0x212cc37b82e80169d444cecddec7d76774cc6dfa4423d33307eab01715dc5efe";

/// The all-zero bytes32 used for "no referenced attestation".
pub const ZERO_UID: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Claim variants, in the order the dispatch points match them.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimVariant {
    /// Verifiable credential with an EIP-712 proof.
    Eip712,
    /// Verifiable credential with a JWT proof.
    Jwt,
    /// Minimal `{recipient, trusted, jwt}` trust record.
    BaseTrust,
    /// EAS off-chain attestation.
    Attestation,
}

impl ClaimVariant {
    pub const ALL: [ClaimVariant; 4] = [
        ClaimVariant::Eip712,
        ClaimVariant::Jwt,
        ClaimVariant::BaseTrust,
        ClaimVariant::Attestation,
    ];

    pub fn schema(self) -> &'static ClaimSchema {
        match self {
            ClaimVariant::Eip712 => &EIP712_CREDENTIAL,
            ClaimVariant::Jwt => &JWT_CREDENTIAL,
            ClaimVariant::BaseTrust => &BASE_TRUST,
            ClaimVariant::Attestation => &ACCOUNT_ATTESTATION,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ClaimVariant::Eip712 => "eip712",
            ClaimVariant::Jwt => "jwt",
            ClaimVariant::BaseTrust => "base-trust",
            ClaimVariant::Attestation => "attestation",
        }
    }
}

impl fmt::Display for ClaimVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimVariant::ALL
            .into_iter()
            .find(|variant| variant.as_str() == s)
            .ok_or_else(|| format!("unknown claim variant: {}", s))
    }
}

/// Static description of one claim variant.
#[derive(Debug)]
pub struct ClaimSchema {
    /// Name of the create mutation on the remote schema.
    pub mutation: &'static str,
    /// Context entries added after the mandatory baseline.
    pub context: &'static [&'static str],
    /// Type entries added after the mandatory baseline.
    pub types: &'static [&'static str],
    /// `credentialSchema.id`, for variants that carry one.
    pub credential_schema: Option<&'static str>,
    /// `proof.type` tag, for variants with a linked-data style proof.
    pub proof_type: Option<&'static str>,
    /// Fields requested under `document` in the mutation response.
    pub response: &'static Lazy<Vec<Selection>>,
}

pub static EIP712_CREDENTIAL: ClaimSchema = ClaimSchema {
    mutation: "createAccountTrustCredential712",
    context: &[MANDATORY_CREDENTIAL_CONTEXT, TRUSTED_REVIEWER_CONTEXT],
    types: &[MANDATORY_CREDENTIAL_TYPE, "Trusted"],
    credential_schema: Some(TRUSTED_JSON_SCHEMA),
    proof_type: Some(EIP712_PROOF_TYPE),
    response: &EIP712_RESPONSE,
};

pub static JWT_CREDENTIAL: ClaimSchema = ClaimSchema {
    mutation: "createAccountTrustCredentialJWT",
    context: &[MANDATORY_CREDENTIAL_CONTEXT, TRUSTED_REVIEWER_CONTEXT],
    types: &[MANDATORY_CREDENTIAL_TYPE, "Trusted"],
    credential_schema: Some(TRUSTED_JSON_SCHEMA),
    proof_type: Some(JWT_PROOF_TYPE),
    response: &JWT_RESPONSE,
};

pub static BASE_TRUST: ClaimSchema = ClaimSchema {
    mutation: "createTrust",
    context: &[],
    types: &[],
    credential_schema: None,
    proof_type: None,
    response: &BASE_TRUST_RESPONSE,
};

pub static ACCOUNT_ATTESTATION: ClaimSchema = ClaimSchema {
    mutation: "createAccountAttestation",
    context: &[],
    types: &[],
    credential_schema: None,
    proof_type: None,
    response: &ATTESTATION_RESPONSE,
};

fn credential_response(proof: Vec<Selection>) -> Vec<Selection> {
    vec![
        field("id"),
        reference("issuer"),
        field("issuanceDate"),
        field("type"),
        field("context"),
        object("credentialSubject", vec![reference("id"), field("trusted")]),
        object("proof", proof),
    ]
}

/// Member lists the remote schema stores for an EIP-712 proof.
pub fn eip712_selection() -> Selection {
    object(
        "eip712",
        vec![
            object("domain", vec![field("name"), field("version"), field("chainId")]),
            object(
                "types",
                vec![
                    members("EIP712Domain"),
                    members("CredentialSchema"),
                    members("CredentialSubject"),
                    members("Proof"),
                    members("VerifiableCredential"),
                ],
            ),
            field("primaryType"),
        ],
    )
}

static EIP712_RESPONSE: Lazy<Vec<Selection>> = Lazy::new(|| {
    credential_response(vec![
        field("type"),
        field("proofPurpose"),
        field("verificationMethod"),
        field("proofValue"),
        field("created"),
        eip712_selection(),
    ])
});

static JWT_RESPONSE: Lazy<Vec<Selection>> =
    Lazy::new(|| credential_response(vec![field("type"), field("jwt")]));

static BASE_TRUST_RESPONSE: Lazy<Vec<Selection>> = Lazy::new(|| {
    vec![field("id"), reference("recipient"), field("trusted"), field("jwt")]
});

static ATTESTATION_RESPONSE: Lazy<Vec<Selection>> = Lazy::new(|| {
    vec![
        field("id"),
        field("uid"),
        field("schema"),
        reference("attester"),
        field("verifyingContract"),
        field("easVersion"),
        field("trusted"),
        field("version"),
        field("chainId"),
        members("types"),
        field("r"),
        field("s"),
        field("v"),
        reference("recipient"),
        field("refUID"),
        field("data"),
        field("time"),
    ]
});

/// Deployment of the Ethereum Attestation Service on one chain.
#[derive(Debug, Clone, Copy)]
pub struct EasChainConfig {
    pub chain_id: u64,
    pub version: &'static str,
    pub contract_address: &'static str,
}

pub const EAS_MAINNET: EasChainConfig = EasChainConfig {
    chain_id: 1,
    version: "0.26",
    contract_address: "0xA1207F3BBa224E2c9c3c6D5aF63D0eb1582Ce587",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_parse_from_their_display_form() {
        for variant in ClaimVariant::ALL {
            assert_eq!(variant.to_string().parse::<ClaimVariant>().unwrap(), variant);
        }
        assert!("credential".parse::<ClaimVariant>().is_err());
    }

    #[test]
    fn variant_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ClaimVariant::BaseTrust).unwrap();
        assert_eq!(json, "\"base-trust\"");
    }

    #[test]
    fn credential_variants_start_with_baseline_entries() {
        for schema in [&EIP712_CREDENTIAL, &JWT_CREDENTIAL] {
            assert_eq!(schema.context[0], MANDATORY_CREDENTIAL_CONTEXT);
            assert_eq!(schema.types[0], MANDATORY_CREDENTIAL_TYPE);
            assert!(schema.proof_type.is_some());
        }
    }

    #[test]
    fn every_variant_has_a_distinct_mutation() {
        let mut names: Vec<_> = ClaimVariant::ALL
            .iter()
            .map(|variant| variant.schema().mutation)
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
    }
}
