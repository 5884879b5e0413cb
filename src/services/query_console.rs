// src/services/query_console.rs
//! Query Console
//!
//! Read-only passthrough to the remote document service, plus the preset
//! queries offered to operators (latest claim of each kind).

use crate::graphql::selection::{field, fragment, object, reference, Selection};
use crate::models::schema::eip712_selection;
use crate::storage::{QueryResponse, ServiceError, SubmissionClient};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Preset read queries.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PresetQuery {
    /// Latest entry of the verifiable-claim interface index.
    LatestVerifiableClaim,
    /// Latest base trust record.
    LatestBaseTrust,
    /// Latest account attestation, through the claim interface.
    LatestAttestation,
    /// Latest credential with an EIP-712 proof.
    LatestEip712Credential,
    /// Latest credential with a JWS proof.
    LatestJwsCredential,
}

impl PresetQuery {
    pub const ALL: [PresetQuery; 5] = [
        PresetQuery::LatestVerifiableClaim,
        PresetQuery::LatestBaseTrust,
        PresetQuery::LatestAttestation,
        PresetQuery::LatestEip712Credential,
        PresetQuery::LatestJwsCredential,
    ];

    /// Renders the query text.
    pub fn query(self) -> String {
        match self {
            PresetQuery::LatestVerifiableClaim => latest(
                "verifiableClaimIndex",
                claim_node(vec![fragment(
                    "VerifiableCredential",
                    vec![
                        field("expirationDate"),
                        field("context"),
                        fragment(
                            "VCEIP712Proof",
                            vec![
                                object("proof", vec![field("created")]),
                                fragment("AccountTrustCredential712", vec![field("trusted")]),
                            ],
                        ),
                        fragment("VCJWTProof", vec![object("proof", vec![field("type"), field("jwt")])]),
                    ],
                )]),
            ),
            PresetQuery::LatestBaseTrust => latest(
                "trustIndex",
                claim_node(vec![field("trusted"), field("jwt")]),
            ),
            PresetQuery::LatestAttestation => latest(
                "verifiableClaimIndex",
                claim_node(vec![fragment(
                    "AccountAttestation",
                    vec![field("r"), field("s"), field("v"), field("trusted")],
                )]),
            ),
            PresetQuery::LatestEip712Credential => latest(
                "verifiableCredentialIndex",
                credential_node(vec![
                    field("verificationMethod"),
                    field("created"),
                    field("proofPurpose"),
                    field("type"),
                    field("proofValue"),
                    eip712_selection(),
                ]),
            ),
            PresetQuery::LatestJwsCredential => latest(
                "verifiableCredentialJWSIndex",
                credential_node(vec![field("type"), field("jwt")]),
            ),
        }
    }
}

/// `query { <index>(last: 1) { edges { node { .. } } } }`
fn latest(index: &str, node: Vec<Selection>) -> String {
    let edges = object("edges", vec![object("node", node)]);
    format!("query {{ {}(last: 1) {{ {} }} }}", index, edges)
}

fn claim_node(mut extra: Vec<Selection>) -> Vec<Selection> {
    let mut node = vec![reference("recipient"), reference("controller")];
    node.append(&mut extra);
    node
}

fn credential_node(proof: Vec<Selection>) -> Vec<Selection> {
    vec![
        reference("issuer"),
        field("context"),
        field("type"),
        object("credentialSchema", vec![field("id"), field("type")]),
        field("issuanceDate"),
        object("credentialSubject", vec![reference("id"), field("isTrusted")]),
        object("proof", proof),
    ]
}

/// Operator-facing query passthrough.
#[derive(Clone)]
pub struct QueryConsole {
    client: SubmissionClient,
}

impl QueryConsole {
    pub fn new(client: SubmissionClient) -> Self {
        QueryConsole { client }
    }

    /// Runs an ad hoc query.
    ///
    /// # Returns
    /// `data` of the response, or `None` when there is none or it is a
    /// schema introspection result (`__schema`).
    pub async fn fetch(&self, query: &str) -> Result<Option<Value>, ServiceError> {
        let response = self.client.query(query).await?;
        debug!("Console query returned data: {}", response.data.is_some());
        Ok(response
            .data
            .filter(|data| data.get("__schema").is_none()))
    }

    /// Runs a preset query and returns the raw `{data, errors}` response.
    pub async fn preset(&self, preset: PresetQuery) -> Result<QueryResponse, ServiceError> {
        self.client.query(&preset.query()).await
    }
}
