// src/services/claim_pipeline.rs
//! Claim Pipeline
//!
//! Orchestrates one claim from request to stored document:
//! build, sign, format, submit. Each step awaits the previous one; there is
//! no retry and no cancellation, so overlapping requests produce independent
//! submissions.
//!
//! Also re-reads and verifies the latest base trust record.

use crate::blockchain::eas::{sign_attestation, AttestationError};
use crate::eip712::{derive_types, TypedDataPayload, TypesGenerationError, CREDENTIAL_PRIMARY_TYPE};
use crate::graphql::{FormatError, Mutation};
use crate::models::credential::{Credential, Proof, VerifiableCredential};
use crate::models::did::Did;
use crate::models::schema::ClaimVariant;
use crate::services::credential_builder;
use crate::services::query_console::PresetQuery;
use crate::storage::{RemoteDocument, ServiceError, SubmissionClient};
use crate::utils::crypto::{format_address, hash_personal_message};
use crate::wallet::{Envelope, EnvelopeError, Session, SignerError};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClaimError {
    #[error("typed data derivation failed: {0}")]
    Types(#[from] TypesGenerationError),
    #[error("signing failed: {0}")]
    Signer(#[from] SignerError),
    #[error("attestation failed: {0}")]
    Attestation(#[from] AttestationError),
    #[error("formatting failed: {0}")]
    Format(#[from] FormatError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("credential serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("verification failed: {0}")]
    Verification(#[from] EnvelopeError),
    #[error("signed payload does not match the stored record")]
    PayloadMismatch,
    #[error("stored record has no `{0}`")]
    MissingField(&'static str),
}

/// What to claim, about whom.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClaimRequest {
    /// Recipient address as entered; not validated.
    pub recipient: String,
    pub variant: ClaimVariant,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// No session: nothing was built or sent.
    NotReady,
    Submitted {
        credential: Credential,
        document: RemoteDocument,
    },
}

/// A base trust record whose envelope verified.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedTrust {
    /// Issuer resolved from the envelope's `kid`.
    pub issuer: Did,
    /// The verified payload, `{recipient, trusted}`.
    pub payload: Value,
}

/// Runs claims through build, sign, format and submit.
#[derive(Clone)]
pub struct ClaimPipeline {
    client: SubmissionClient,
}

impl ClaimPipeline {
    pub fn new(client: SubmissionClient) -> Self {
        ClaimPipeline { client }
    }

    /// Creates and submits a claim issued by `session`.
    ///
    /// # Arguments
    /// * `session` - Authenticated session, or `None`
    /// * `request` - Variant and recipient
    ///
    /// # Returns
    /// `NotReady` without a session; otherwise the signed credential and the
    /// document the remote service created for it.
    pub async fn create_claim(
        &self,
        session: Option<&Session>,
        request: &ClaimRequest,
    ) -> Result<ClaimOutcome, ClaimError> {
        self.create_claim_at(session, request, Utc::now()).await
    }

    /// [`create_claim`](Self::create_claim) at a fixed issuance time.
    pub async fn create_claim_at(
        &self,
        session: Option<&Session>,
        request: &ClaimRequest,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, ClaimError> {
        let Some(session) = session else {
            info!("No session; {} claim not created", request.variant);
            return Ok(ClaimOutcome::NotReady);
        };
        let Some(credential) =
            credential_builder::build(request.variant, &request.recipient, Some(session.did()), now)
        else {
            return Ok(ClaimOutcome::NotReady);
        };

        let credential = sign(session, credential).await?;
        let mutation = Mutation::for_credential(&credential)?;
        let document = self.client.submit(session, &mutation).await?;
        info!(
            "Created {} claim for {} ({})",
            request.variant,
            credential.recipient(),
            document.id().unwrap_or("no id")
        );

        if request.variant == ClaimVariant::BaseTrust {
            // Read-after-write check; the claim is already stored either way.
            if let Err(e) = self.latest_base_credential().await {
                warn!("Stored base credential did not verify: {}", e);
            }
        }

        Ok(ClaimOutcome::Submitted { credential, document })
    }

    /// Fetches the latest base trust record and verifies its envelope.
    ///
    /// # Returns
    /// `None` when the index is empty.
    pub async fn latest_base_credential(&self) -> Result<Option<VerifiedTrust>, ClaimError> {
        let response = self.client.query(&PresetQuery::LatestBaseTrust.query()).await?;
        if let Some(errors) = response.errors() {
            return Err(ServiceError::Rejected(errors.to_vec()).into());
        }
        let node = response
            .data
            .as_ref()
            .and_then(|data| data.pointer("/trustIndex/edges/0/node"));
        match node {
            Some(node) => Ok(Some(verify_base_credential(node)?)),
            None => Ok(None),
        }
    }
}

/// Attaches signature material to an unsigned claim.
pub async fn sign(session: &Session, credential: Credential) -> Result<Credential, ClaimError> {
    let signer = session.signer();
    match credential {
        Credential::Verifiable(vc) => Ok(Credential::Verifiable(sign_verifiable(session, vc).await?)),
        Credential::BaseTrust(mut trust) => {
            let payload = json!({ "recipient": trust.recipient, "trusted": trust.trusted });
            let envelope = signer.create_compact_signature(&payload).await?;
            trust.jwt = Some(envelope.encode()?);
            Ok(Credential::BaseTrust(trust))
        }
        Credential::Attestation(attestation) => Ok(Credential::Attestation(
            sign_attestation(signer, attestation).await?,
        )),
    }
}

async fn sign_verifiable(session: &Session, mut vc: VerifiableCredential) -> Result<VerifiableCredential, ClaimError> {
    let message = serde_json::to_value(&vc)?;
    match &mut vc.proof {
        Proof::Eip712(proof) => {
            let info = derive_types(&message, CREDENTIAL_PRIMARY_TYPE)?;
            let payload = TypedDataPayload::from_info(&info, message)?;
            let envelope = session.signer().create_typed_signature(&payload).await?;
            proof.proof_value = Some(envelope.encode()?);
            proof.eip712 = Some(info);
        }
        Proof::Jwt(proof) => {
            let envelope = session.signer().create_compact_signature(&message).await?;
            proof.jwt = Some(envelope.encode()?);
        }
    }
    Ok(vc)
}

/// Verifies a stored base trust record.
///
/// A JWS envelope must be signed by the `did:key` in its `kid` and name the
/// record's recipient. An ECDSA envelope is checked by recovering the account
/// that signed `{recipient, trusted}`; when the record names a `controller`,
/// that account must be it.
pub fn verify_base_credential(document: &Value) -> Result<VerifiedTrust, ClaimError> {
    let encoded = document
        .get("jwt")
        .and_then(Value::as_str)
        .ok_or(ClaimError::MissingField("jwt"))?;
    let recipient = reference_id(document, "recipient");

    match Envelope::decode(encoded)? {
        Envelope::Jws(jws) => {
            let payload = jws.verify()?;
            if recipient.is_some() && payload.get("recipient").and_then(Value::as_str) != recipient {
                return Err(ClaimError::PayloadMismatch);
            }
            Ok(VerifiedTrust {
                issuer: jws.signer()?,
                payload,
            })
        }
        Envelope::Ecdsa(signature) => {
            let recipient = recipient.ok_or(ClaimError::MissingField("recipient"))?;
            let trusted = document
                .get("trusted")
                .and_then(Value::as_bool)
                .ok_or(ClaimError::MissingField("trusted"))?;
            let payload = json!({ "recipient": recipient, "trusted": trusted });
            let digest = hash_personal_message(&serde_json::to_vec(&payload)?);
            let issuer = Did::pkh(&format_address(&signature.recover_address(&digest)?));
            match reference_id(document, "controller") {
                Some(controller) if controller != issuer.as_str() => Err(ClaimError::PayloadMismatch),
                _ => Ok(VerifiedTrust { issuer, payload }),
            }
        }
    }
}

/// A DID field stored either bare or as an `{id}` reference.
fn reference_id<'a>(document: &'a Value, field: &str) -> Option<&'a str> {
    document
        .get(field)
        .and_then(|value| value.get("id").or(Some(value)))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_session, InMemoryDocumentService, RejectingService};
    use crate::wallet::WalletSession;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn pipeline() -> (ClaimPipeline, Arc<InMemoryDocumentService>) {
        let service = Arc::new(InMemoryDocumentService::default());
        (ClaimPipeline::new(SubmissionClient::new(service.clone())), service)
    }

    fn request(variant: ClaimVariant, recipient: &str) -> ClaimRequest {
        ClaimRequest {
            recipient: recipient.to_string(),
            variant,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn no_session_is_not_ready_and_sends_nothing() {
        let (pipeline, service) = pipeline();
        for variant in ClaimVariant::ALL {
            let outcome = pipeline.create_claim(None, &request(variant, "0xabc")).await.unwrap();
            assert_eq!(outcome, ClaimOutcome::NotReady);
        }
        assert_eq!(service.len(), 0);
        assert_eq!(service.queries(), 0);
    }

    #[tokio::test]
    async fn base_trust_claim_round_trips_and_verifies() {
        let (pipeline, service) = pipeline();
        let session = test_session();
        let outcome = pipeline
            .create_claim_at(Some(&session), &request(ClaimVariant::BaseTrust, "0xABCDEF"), now())
            .await
            .unwrap();
        let ClaimOutcome::Submitted { credential, document } = outcome else {
            panic!("expected a submission");
        };
        assert_eq!(credential.recipient(), "did:pkh:eip155:1:0xabcdef");
        assert_eq!(document.document["recipient"]["id"], "did:pkh:eip155:1:0xabcdef");
        assert_eq!(document.document["trusted"], true);
        assert_eq!(service.len(), 1);

        let verified = verify_base_credential(&document.document).unwrap();
        assert_eq!(&verified.issuer, session.did());
        assert_eq!(verified.payload["trusted"], true);

        let latest = pipeline.latest_base_credential().await.unwrap().unwrap();
        assert_eq!(latest.payload["recipient"], "did:pkh:eip155:1:0xabcdef");
    }

    #[tokio::test]
    async fn wallet_signed_base_trust_verifies_against_the_account() {
        let (pipeline, _) = pipeline();
        let session = Session::new(WalletSession::random());
        let ClaimOutcome::Submitted { document, .. } = pipeline
            .create_claim_at(Some(&session), &request(ClaimVariant::BaseTrust, "0xAbC"), now())
            .await
            .unwrap()
        else {
            panic!("expected a submission");
        };
        let verified = verify_base_credential(&document.document).unwrap();
        assert_eq!(&verified.issuer, session.did());
        assert_eq!(verified.payload, json!({ "recipient": "did:pkh:eip155:1:0xabc", "trusted": true }));

        let latest = pipeline.latest_base_credential().await.unwrap().unwrap();
        assert_eq!(&latest.issuer, session.did());
    }

    #[tokio::test]
    async fn wallet_signed_base_trust_rejects_edits() {
        let (pipeline, _) = pipeline();
        let session = Session::new(WalletSession::random());
        let ClaimOutcome::Submitted { document, .. } = pipeline
            .create_claim_at(Some(&session), &request(ClaimVariant::BaseTrust, "0xabc"), now())
            .await
            .unwrap()
        else {
            panic!("expected a submission");
        };
        let mut flipped = document.document.clone();
        flipped["trusted"] = json!(false);
        let recovered = verify_base_credential(&flipped).map(|v| v.issuer);
        assert!(recovered.map_or(true, |issuer| &issuer != session.did()));

        let mut foreign = document.document.clone();
        foreign["controller"] = json!({ "id": "did:pkh:eip155:1:0x0000000000000000000000000000000000000001" });
        assert!(matches!(verify_base_credential(&foreign), Err(ClaimError::PayloadMismatch)));
    }

    #[tokio::test]
    async fn eip712_claim_preserves_fields_through_storage() {
        let (pipeline, _) = pipeline();
        let session = test_session();
        let outcome = pipeline
            .create_claim_at(Some(&session), &request(ClaimVariant::Eip712, "0xAbC"), now())
            .await
            .unwrap();
        let ClaimOutcome::Submitted { credential, document } = outcome else {
            panic!("expected a submission");
        };
        let Credential::Verifiable(vc) = &credential else {
            panic!("expected a verifiable credential");
        };
        let Proof::Eip712(proof) = &vc.proof else {
            panic!("expected an EIP-712 proof");
        };
        let info = proof.eip712.as_ref().unwrap();
        assert_eq!(info.primary_type, "VerifiableCredential");
        assert_eq!(info.domain.chain_id, 1);
        assert!(info.types.contains_key("CredentialSubject"));

        let stored = &document.document;
        assert_eq!(stored["issuer"]["id"], session.did().as_str());
        assert_eq!(stored["credentialSubject"]["id"]["id"], "did:pkh:eip155:1:0xabc");
        assert_eq!(stored["credentialSubject"]["trusted"], true);
        assert_eq!(stored["proof"]["type"], "EthereumEip712Signature2021");
        assert_eq!(stored["proof"]["proofValue"], proof.proof_value.clone().unwrap());
    }

    #[tokio::test]
    async fn jwt_claim_envelope_verifies() {
        let (pipeline, _) = pipeline();
        let session = test_session();
        let ClaimOutcome::Submitted { credential, .. } = pipeline
            .create_claim_at(Some(&session), &request(ClaimVariant::Jwt, "0xabc"), now())
            .await
            .unwrap()
        else {
            panic!("expected a submission");
        };
        let Credential::Verifiable(VerifiableCredential { proof: Proof::Jwt(proof), .. }) = credential else {
            panic!("expected a JWT credential");
        };
        let Envelope::Jws(jws) = Envelope::decode(proof.jwt.as_deref().unwrap()).unwrap() else {
            panic!("expected a JWS");
        };
        let payload = jws.verify().unwrap();
        assert_eq!(payload["credentialSubject"]["id"], "did:pkh:eip155:1:0xabc");
        assert_eq!(payload["proof"]["type"], "JwtProof2020");
    }

    #[tokio::test]
    async fn two_submissions_are_two_documents() {
        let (pipeline, service) = pipeline();
        let session = test_session();
        let claim = request(ClaimVariant::BaseTrust, "0xabc");
        let ClaimOutcome::Submitted { document: first, .. } =
            pipeline.create_claim(Some(&session), &claim).await.unwrap()
        else {
            panic!("expected a submission");
        };
        let ClaimOutcome::Submitted { document: second, .. } =
            pipeline.create_claim(Some(&session), &claim).await.unwrap()
        else {
            panic!("expected a submission");
        };
        assert_ne!(first.id(), second.id());
        assert_eq!(service.len(), 2);
    }

    #[tokio::test]
    async fn attestation_with_empty_destination_is_accepted() {
        let (pipeline, _) = pipeline();
        let session = Session::new(WalletSession::random());
        let ClaimOutcome::Submitted { document, credential } = pipeline
            .create_claim_at(Some(&session), &request(ClaimVariant::Attestation, ""), now())
            .await
            .unwrap()
        else {
            panic!("expected a submission");
        };
        assert_eq!(credential.recipient(), "did:pkh:eip155:1:");
        assert_eq!(document.document["recipient"]["id"], "did:pkh:eip155:1:");
        assert_eq!(document.document["attester"]["id"], session.did().as_str());
        assert_eq!(document.document["easVersion"], "0.26");
    }

    #[tokio::test]
    async fn key_session_cannot_attest() {
        let (pipeline, service) = pipeline();
        let result = pipeline
            .create_claim(Some(&test_session()), &request(ClaimVariant::Attestation, "0xabc"))
            .await;
        assert!(matches!(result, Err(ClaimError::Attestation(AttestationError::NoAccount))));
        assert_eq!(service.len(), 0);
    }

    #[tokio::test]
    async fn remote_rejection_is_relayed() {
        let errors = vec![json!({ "message": "recipient is not a valid DID" })];
        let pipeline = ClaimPipeline::new(SubmissionClient::new(Arc::new(RejectingService(errors.clone()))));
        let result = pipeline
            .create_claim(Some(&test_session()), &request(ClaimVariant::BaseTrust, "garbage"))
            .await;
        match result {
            Err(ClaimError::Service(ServiceError::Rejected(relayed))) => assert_eq!(relayed, errors),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn tampered_record_fails_verification() {
        let document = json!({ "recipient": { "id": "did:pkh:eip155:1:0xabc" }, "jwt": "bm90IGpzb24" });
        assert!(verify_base_credential(&document).is_err());
        assert!(matches!(
            verify_base_credential(&json!({ "trusted": true })),
            Err(ClaimError::MissingField("jwt"))
        ));
    }
}
