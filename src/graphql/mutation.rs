// src/graphql/mutation.rs
//! Create mutations for signed claims.
//!
//! Each claim variant maps to exactly one mutation on the remote schema. The
//! mutation's `content` mirrors the credential field for field, with the
//! renames the remote schema imposes:
//! - `@context` is stored as `context`
//! - `credentialSubject.isTrusted` is stored as `trusted`
//! - the issuer is stored as an `{id}` reference
//! - the subject id is duplicated as a top-level `recipient`

use crate::graphql::selection::Selection;
use crate::graphql::value::{self as literal, GqlValue, LiteralError};
use crate::models::attestation::OffchainAttestation;
use crate::models::credential::{Credential, Proof, TrustCredential, VerifiableCredential};
use crate::models::did::Did;
use crate::models::schema::ClaimVariant;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FormatError {
    #[error("{0} claim has no signature material")]
    Unsigned(ClaimVariant),
    #[error(transparent)]
    Literal(#[from] LiteralError),
}

/// A ready-to-send create mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    field: &'static str,
    content: GqlValue,
    response: &'static [Selection],
}

impl Mutation {
    /// Formats the create mutation for a signed credential.
    ///
    /// # Errors
    /// * `Unsigned` - the credential carries no proof, jwt or signature yet
    /// * `Literal` - a value has no GraphQL literal form
    pub fn for_credential(credential: &Credential) -> Result<Self, FormatError> {
        let variant = credential.variant();
        if !credential.is_signed() {
            return Err(FormatError::Unsigned(variant));
        }
        let content = match credential {
            Credential::Verifiable(vc) => verifiable_content(vc)?,
            Credential::BaseTrust(trust) => trust_content(trust)?,
            Credential::Attestation(attestation) => attestation_content(attestation)?,
        };
        let schema = variant.schema();
        Ok(Mutation {
            field: schema.mutation,
            content,
            response: schema.response.as_slice(),
        })
    }

    /// Name of the mutation field, e.g. `createTrust`.
    pub fn field(&self) -> &str {
        self.field
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mutation {{ {}(input: {{ content: {} }}) {{ document {{", self.field, self.content)?;
        for selection in self.response {
            write!(f, " {}", selection)?;
        }
        f.write_str(" } } }")
    }
}

fn reference(id: &Did) -> Result<GqlValue, LiteralError> {
    literal::object([("id", literal::string(id.as_str()))])
}

fn verifiable_content(vc: &VerifiableCredential) -> Result<GqlValue, FormatError> {
    let subject = &vc.credential_subject;
    let proof = match &vc.proof {
        Proof::Eip712(proof) => {
            let (Some(proof_value), Some(eip712)) = (&proof.proof_value, &proof.eip712) else {
                return Err(FormatError::Unsigned(ClaimVariant::Eip712));
            };
            literal::object([
                ("proofPurpose", literal::string(&proof.proof_purpose)),
                ("type", literal::string(vc.proof.type_tag())),
                ("created", literal::string(&proof.created)),
                ("verificationMethod", literal::string(&proof.verification_method)),
                ("proofValue", literal::string(proof_value)),
                (
                    "eip712",
                    literal::object([
                        ("domain", literal::from_serialize(&eip712.domain)?),
                        ("types", literal::from_serialize(&eip712.types)?),
                        ("primaryType", literal::string(&eip712.primary_type)),
                    ])?,
                ),
            ])?
        }
        Proof::Jwt(proof) => {
            let Some(jwt) = &proof.jwt else {
                return Err(FormatError::Unsigned(ClaimVariant::Jwt));
            };
            literal::object([
                ("type", literal::string(vc.proof.type_tag())),
                ("jwt", literal::string(jwt)),
            ])?
        }
    };

    Ok(literal::object([
        ("context", literal::strings(&vc.context)),
        ("issuer", reference(vc.issuer.id())?),
        ("recipient", literal::string(subject.id.as_str())),
        ("trusted", GqlValue::Boolean(subject.is_trusted)),
        ("type", literal::strings(&vc.types)),
        ("credentialSchema", literal::from_serialize(&vc.credential_schema)?),
        ("issuanceDate", literal::string(&vc.issuance_date)),
        (
            "credentialSubject",
            literal::object([
                ("trusted", GqlValue::Boolean(subject.is_trusted)),
                ("id", literal::string(subject.id.as_str())),
            ])?,
        ),
        ("proof", proof),
    ])?)
}

fn trust_content(trust: &TrustCredential) -> Result<GqlValue, FormatError> {
    let Some(jwt) = &trust.jwt else {
        return Err(FormatError::Unsigned(ClaimVariant::BaseTrust));
    };
    Ok(literal::object([
        ("recipient", literal::string(trust.recipient.as_str())),
        ("trusted", GqlValue::Boolean(trust.trusted)),
        ("jwt", literal::string(jwt)),
    ])?)
}

fn attestation_content(attestation: &OffchainAttestation) -> Result<GqlValue, FormatError> {
    let (Some(signature), Some(account)) = (&attestation.signature, &attestation.account) else {
        return Err(FormatError::Unsigned(ClaimVariant::Attestation));
    };
    let message = &attestation.message;
    let domain = &attestation.domain;
    Ok(literal::object([
        ("uid", literal::string(&attestation.uid)),
        ("schema", literal::string(&message.schema)),
        ("attester", literal::string(Did::pkh(account).as_str())),
        ("verifyingContract", literal::string(&domain.verifying_contract)),
        ("easVersion", literal::string(&domain.version)),
        ("version", literal::int(i64::from(message.version))?),
        ("chainId", literal::int(i64::try_from(domain.chain_id).unwrap_or(i64::MAX))?),
        ("trusted", GqlValue::Boolean(true)),
        ("r", literal::string(&signature.r)),
        ("s", literal::string(&signature.s)),
        ("v", literal::int(i64::from(signature.v))?),
        ("types", literal::from_serialize(&attestation.types.attest)?),
        ("recipient", literal::string(Did::pkh(&message.recipient).as_str())),
        ("refUID", literal::string(&message.ref_uid)),
        ("data", literal::string(&message.data)),
        ("time", literal::int(i64::try_from(message.time).unwrap_or(i64::MAX))?),
    ])?)
}
