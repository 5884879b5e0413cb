// src/services/credential_builder.rs
//! Credential Builder
//!
//! Turns a claim request (variant, recipient address, issuer, time) into an
//! unsigned claim. Pure: no I/O, no signing, and the same inputs always give
//! the same credential.
//!
//! Recipient input is never validated here. Whatever the caller typed is
//! lower-cased and embedded; the remote service decides whether it is
//! acceptable.

use crate::blockchain::eas::trust_attestation;
use crate::models::credential::{
    Credential, CredentialSchema, CredentialSubject, Eip712Proof, Issuer, JwtProof, Proof,
    TrustCredential, VerifiableCredential,
};
use crate::models::did::Did;
use crate::models::schema::{
    ClaimVariant, JSON_SCHEMA_VALIDATOR, MANDATORY_CREDENTIAL_CONTEXT, MANDATORY_CREDENTIAL_TYPE,
    PROOF_PURPOSE, EAS_MAINNET,
};
use chrono::{DateTime, SecondsFormat, Utc};

/// Merges a mandatory entry with variant entries.
///
/// The mandatory entry comes first; later duplicates and empty entries are
/// dropped, otherwise order is preserved.
pub fn merge_entries(mandatory: &str, entries: &[&str]) -> Vec<String> {
    let mut merged: Vec<String> = vec![mandatory.to_string()];
    for entry in entries {
        let entry = entry.trim();
        if !entry.is_empty() && !merged.iter().any(|existing| existing == entry) {
            merged.push(entry.to_string());
        }
    }
    merged
}

/// ISO-8601 with millisecond precision and a `Z` suffix.
pub fn issuance_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds the unsigned claim for `variant`.
///
/// # Arguments
/// * `variant` - Claim variant to build
/// * `recipient_address` - Address the claim is about, as entered
/// * `issuer` - Identity of the authenticated session, if any
/// * `now` - Issuance time
///
/// # Returns
/// `None` when there is no issuer (not authenticated); otherwise the claim
/// with every proof field populated except signature material.
pub fn build(
    variant: ClaimVariant,
    recipient_address: &str,
    issuer: Option<&Did>,
    now: DateTime<Utc>,
) -> Option<Credential> {
    let issuer = issuer?;
    let recipient = Did::pkh(recipient_address);
    let credential = match variant {
        ClaimVariant::Eip712 | ClaimVariant::Jwt => {
            Credential::Verifiable(verifiable_credential(variant, recipient, issuer, now))
        }
        ClaimVariant::BaseTrust => Credential::BaseTrust(TrustCredential {
            recipient,
            trusted: true,
            jwt: None,
        }),
        ClaimVariant::Attestation => Credential::Attestation(trust_attestation(
            recipient_address,
            now.timestamp().max(0) as u64,
            &EAS_MAINNET,
        )),
    };
    Some(credential)
}

fn verifiable_credential(
    variant: ClaimVariant,
    recipient: Did,
    issuer: &Did,
    now: DateTime<Utc>,
) -> VerifiableCredential {
    let schema = variant.schema();
    let issuance_date = issuance_timestamp(now);
    let verification_method = issuer.to_string();
    let proof = match variant {
        ClaimVariant::Jwt => Proof::Jwt(JwtProof {
            verification_method,
            created: issuance_date.clone(),
            proof_purpose: PROOF_PURPOSE.to_string(),
            jwt: None,
        }),
        _ => Proof::Eip712(Eip712Proof {
            verification_method,
            created: issuance_date.clone(),
            proof_purpose: PROOF_PURPOSE.to_string(),
            proof_value: None,
            eip712: None,
        }),
    };

    VerifiableCredential {
        context: merge_entries(MANDATORY_CREDENTIAL_CONTEXT, schema.context),
        types: merge_entries(MANDATORY_CREDENTIAL_TYPE, schema.types),
        issuer: Issuer::Id(issuer.clone()),
        issuance_date,
        credential_schema: CredentialSchema {
            id: schema.credential_schema.unwrap_or_default().to_string(),
            kind: JSON_SCHEMA_VALIDATOR.to_string(),
        },
        credential_subject: CredentialSubject {
            is_trusted: true,
            id: recipient,
        },
        proof,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::{TRUSTED_JSON_SCHEMA, TRUSTED_REVIEWER_CONTEXT};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
    }

    fn issuer() -> Did {
        Did::pkh("0x1111111111111111111111111111111111111111")
    }

    #[test]
    fn merge_puts_mandatory_first_once() {
        assert_eq!(
            merge_entries("VerifiableCredential", &["VerifiableCredential", "Trusted", "", "Trusted"]),
            vec!["VerifiableCredential", "Trusted"]
        );
        assert_eq!(merge_entries("A", &[]), vec!["A"]);
    }

    #[test]
    fn timestamp_has_millis_and_zulu() {
        assert_eq!(issuance_timestamp(now()), "2024-03-01T12:30:45.000Z");
    }

    #[test]
    fn no_issuer_builds_nothing() {
        for variant in ClaimVariant::ALL {
            assert!(build(variant, "0xabc", None, now()).is_none());
        }
    }

    #[test]
    fn eip712_credential_shape() {
        let Some(Credential::Verifiable(vc)) =
            build(ClaimVariant::Eip712, "0xAbCdEf0000000000000000000000000000000001", Some(&issuer()), now())
        else {
            panic!("expected a verifiable credential");
        };
        assert_eq!(vc.context, vec![MANDATORY_CREDENTIAL_CONTEXT, TRUSTED_REVIEWER_CONTEXT]);
        assert_eq!(vc.types, vec!["VerifiableCredential", "Trusted"]);
        assert_eq!(vc.issuer.id(), &issuer());
        assert_eq!(vc.credential_schema.id, TRUSTED_JSON_SCHEMA);
        assert_eq!(vc.credential_schema.kind, "JsonSchemaValidator2018");
        assert_eq!(
            vc.credential_subject.id.as_str(),
            "did:pkh:eip155:1:0xabcdef0000000000000000000000000000000001"
        );
        assert!(vc.credential_subject.is_trusted);
        let Proof::Eip712(proof) = &vc.proof else {
            panic!("expected an EIP-712 proof");
        };
        assert_eq!(proof.verification_method, issuer().to_string());
        assert_eq!(proof.created, vc.issuance_date);
        assert_eq!(proof.proof_purpose, "assertionMethod");
        assert!(proof.proof_value.is_none() && proof.eip712.is_none());
    }

    #[test]
    fn baseline_entries_appear_exactly_once() {
        for variant in [ClaimVariant::Eip712, ClaimVariant::Jwt] {
            let Some(Credential::Verifiable(vc)) = build(variant, "0xabc", Some(&issuer()), now()) else {
                panic!("expected a verifiable credential");
            };
            assert_eq!(vc.types[0], MANDATORY_CREDENTIAL_TYPE);
            assert_eq!(vc.types.iter().filter(|t| *t == MANDATORY_CREDENTIAL_TYPE).count(), 1);
            assert_eq!(vc.context[0], MANDATORY_CREDENTIAL_CONTEXT);
            assert_eq!(vc.context.iter().filter(|c| *c == MANDATORY_CREDENTIAL_CONTEXT).count(), 1);
        }
    }

    #[test]
    fn jwt_variant_gets_jwt_proof_tag() {
        let credential = build(ClaimVariant::Jwt, "0xabc", Some(&issuer()), now()).unwrap();
        assert_eq!(credential.variant(), ClaimVariant::Jwt);
        let json = serde_json::to_value(&credential).unwrap();
        assert_eq!(json["proof"]["type"], "JwtProof2020");
        assert!(json["proof"].get("jwt").is_none());
    }

    #[test]
    fn base_trust_is_minimal() {
        let credential = build(ClaimVariant::BaseTrust, "0xABC", Some(&issuer()), now()).unwrap();
        assert_eq!(
            serde_json::to_value(&credential).unwrap(),
            serde_json::json!({ "recipient": "did:pkh:eip155:1:0xabc", "trusted": true })
        );
    }

    #[test]
    fn malformed_recipient_flows_through() {
        let credential = build(ClaimVariant::BaseTrust, "Not An Address", Some(&issuer()), now()).unwrap();
        assert_eq!(credential.recipient(), "did:pkh:eip155:1:not an address");
    }

    #[test]
    fn empty_attestation_destination_is_accepted() {
        let credential = build(ClaimVariant::Attestation, "", Some(&issuer()), now()).unwrap();
        assert_eq!(credential.variant(), ClaimVariant::Attestation);
        assert_eq!(credential.recipient(), "did:pkh:eip155:1:");
        let Credential::Attestation(attestation) = credential else {
            panic!("expected an attestation");
        };
        assert_eq!(attestation.message.time, now().timestamp() as u64);
    }
}
