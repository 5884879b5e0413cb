// src/models/credential.rs
//! Credential data model.
//!
//! Defines the claim shapes this system issues:
//! - [`VerifiableCredential`]: a W3C-style credential with either an EIP-712
//!   or a JWT proof
//! - [`TrustCredential`]: the minimal base trust record
//! - [`OffchainAttestation`]: an EAS off-chain attestation
//!
//! [`Credential`] is the sum over all of them. The proof kind is part of the
//! type, so a credential can never carry two proof subtrees at once.

use crate::models::attestation::OffchainAttestation;
use crate::models::did::Did;
use crate::models::schema::ClaimVariant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Any claim produced by the credential builder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Credential {
    Verifiable(VerifiableCredential),
    BaseTrust(TrustCredential),
    Attestation(OffchainAttestation),
}

impl Credential {
    /// The schema variant this credential belongs to.
    pub fn variant(&self) -> ClaimVariant {
        match self {
            Credential::Verifiable(vc) => match vc.proof {
                Proof::Eip712(_) => ClaimVariant::Eip712,
                Proof::Jwt(_) => ClaimVariant::Jwt,
            },
            Credential::BaseTrust(_) => ClaimVariant::BaseTrust,
            Credential::Attestation(_) => ClaimVariant::Attestation,
        }
    }

    /// Whether signature material has been attached.
    pub fn is_signed(&self) -> bool {
        match self {
            Credential::Verifiable(vc) => vc.proof.is_signed(),
            Credential::BaseTrust(trust) => trust.jwt.is_some(),
            Credential::Attestation(attestation) => attestation.signature.is_some(),
        }
    }

    /// Identity the claim is about, as embedded in the payload.
    pub fn recipient(&self) -> String {
        match self {
            Credential::Verifiable(vc) => vc.credential_subject.id.to_string(),
            Credential::BaseTrust(trust) => trust.recipient.to_string(),
            Credential::Attestation(attestation) => {
                Did::pkh(&attestation.message.recipient).to_string()
            }
        }
    }
}

/// A verifiable credential following the
/// [W3C Verifiable Credentials Data Model](https://www.w3.org/TR/vc-data-model/).
///
/// Field order matches the JSON the builder emits; EIP-712 type generation
/// sorts properties itself, so the order carries no meaning for signing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    /// JSON-LD contexts, mandatory baseline first.
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// Credential types, `VerifiableCredential` first.
    #[serde(rename = "type")]
    pub types: Vec<String>,

    pub issuer: Issuer,

    /// ISO-8601 issuance time, fixed when the credential is built.
    pub issuance_date: String,

    pub credential_schema: CredentialSchema,

    pub credential_subject: CredentialSubject,

    pub proof: Proof,
}

/// Credential issuer, either a bare DID or an `{id}` object.
///
/// Credentials built here always use the bare form; the object form is
/// accepted from API clients that post already-signed credentials.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Issuer {
    Id(Did),
    Object { id: Did },
}

impl Issuer {
    pub fn id(&self) -> &Did {
        match self {
            Issuer::Id(id) | Issuer::Object { id } => id,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CredentialSchema {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// The claim body: "the issuer trusts `id`".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    pub is_trusted: bool,
    pub id: Did,
}

/// Linked-data proof, tagged by its `type` field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum Proof {
    #[serde(rename = "EthereumEip712Signature2021")]
    Eip712(Eip712Proof),
    #[serde(rename = "JwtProof2020")]
    Jwt(JwtProof),
}

impl Proof {
    pub fn is_signed(&self) -> bool {
        match self {
            Proof::Eip712(proof) => proof.proof_value.is_some() && proof.eip712.is_some(),
            Proof::Jwt(proof) => proof.jwt.is_some(),
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Proof::Eip712(_) => crate::models::schema::EIP712_PROOF_TYPE,
            Proof::Jwt(_) => crate::models::schema::JWT_PROOF_TYPE,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Proof {
    pub verification_method: String,
    pub created: String,
    pub proof_purpose: String,

    /// Base64 of the signed envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,

    /// The typed-data description the signature was made over.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eip712: Option<Eip712Info>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JwtProof {
    pub verification_method: String,
    pub created: String,
    pub proof_purpose: String,

    /// Base64 of the compact signed envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}

/// `proof.eip712` of an
/// [EthereumEip712Signature2021](https://w3c-ccg.github.io/ethereum-eip712-signature-2021-spec/)
/// proof.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Info {
    pub domain: Eip712Domain,
    pub types: Eip712Types,
    pub primary_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    pub chain_id: u64,
    pub name: String,
    pub version: String,
}

/// Struct name → ordered member list.
pub type Eip712Types = BTreeMap<String, Vec<MemberVariable>>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemberVariable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl MemberVariable {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        MemberVariable {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// The base trust record: a recipient, a flag and a signed envelope.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrustCredential {
    pub recipient: Did,
    pub trusted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,
}
