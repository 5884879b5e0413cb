// src/blockchain/indexer.rs
//! Client for the EAS attestation indexer.
//!
//! The indexer exposes a GraphQL endpoint at `{base}/graphql` taking
//! `{query, variables}`. Every lookup here is scoped to the trust schema.

use crate::models::attestation::{EnsName, IndexedAttestation};
use crate::models::schema::TRUST_SCHEMA_UID;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

const ATTESTATION_QUERY: &str = "query Query($where: AttestationWhereUniqueInput!) { attestation(where: $where) { id attester recipient revocationTime expirationTime time txid data } }";

const ATTESTATIONS_QUERY: &str = "query Attestations($where: AttestationWhereInput, $orderBy: [AttestationOrderByWithRelationInput!]) { attestations(where: $where, orderBy: $orderBy) { attester revocationTime expirationTime time recipient id data } }";

const CONFIRMATIONS_QUERY: &str = "query Attestations($where: AttestationWhereInput, $orderBy: [AttestationOrderByWithRelationInput!]) { attestations(where: $where, orderBy: $orderBy) { attester revocationTime expirationTime time recipient id data refUID } }";

const ENS_NAMES_QUERY: &str =
    "query Query($where: EnsNameWhereInput) { ensNames(where: $where) { id name } }";

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("indexer request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("indexer returned errors: {}", Value::Array(.0.clone()))]
    Rejected(Vec<Value>),
    #[error("indexer response has no `{0}`")]
    MissingField(&'static str),
    #[error("unexpected indexer response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct IndexerResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

/// Attestation indexer bound to one deployment.
#[derive(Clone)]
pub struct AttestationIndexer {
    client: reqwest::Client,
    endpoint: String,
}

impl AttestationIndexer {
    /// Creates an indexer client for `base_url` (e.g. `https://easscan.org`).
    pub fn new(base_url: &str) -> Self {
        AttestationIndexer {
            client: reqwest::Client::new(),
            endpoint: format!("{}/graphql", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        field: &'static str,
    ) -> Result<T, IndexerError> {
        debug!("Indexer query `{}`", field);
        let response: IndexerResponse = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?
            .json()
            .await?;
        extract(response, field)
    }

    /// Looks up a single attestation by UID.
    pub async fn get_attestation(&self, uid: &str) -> Result<Option<IndexedAttestation>, IndexerError> {
        self.post(ATTESTATION_QUERY, attestation_variables(uid), "attestation")
            .await
    }

    /// Trust attestations made by or about `address`, newest first.
    pub async fn get_attestations_for_address(
        &self,
        address: &str,
    ) -> Result<Vec<IndexedAttestation>, IndexerError> {
        self.post(ATTESTATIONS_QUERY, address_variables(address), "attestations")
            .await
    }

    /// Trust attestations referencing any of `ref_uids`, newest first.
    pub async fn get_confirmation_attestations_for_uids(
        &self,
        ref_uids: &[String],
    ) -> Result<Vec<IndexedAttestation>, IndexerError> {
        self.post(CONFIRMATIONS_QUERY, confirmation_variables(ref_uids), "attestations")
            .await
    }

    /// ENS names of `addresses`, matched case-insensitively.
    pub async fn get_ens_names(&self, addresses: &[String]) -> Result<Vec<EnsName>, IndexerError> {
        self.post(ENS_NAMES_QUERY, ens_variables(addresses), "ensNames")
            .await
    }
}

fn extract<T: DeserializeOwned>(response: IndexerResponse, field: &'static str) -> Result<T, IndexerError> {
    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        return Err(IndexerError::Rejected(errors));
    }
    let value = response
        .data
        .and_then(|mut data| data.get_mut(field).map(Value::take))
        .ok_or(IndexerError::MissingField(field))?;
    Ok(serde_json::from_value(value)?)
}

fn attestation_variables(uid: &str) -> Value {
    json!({ "where": { "id": uid } })
}

fn address_variables(address: &str) -> Value {
    json!({
        "where": {
            "schemaId": { "equals": TRUST_SCHEMA_UID },
            "OR": [
                { "attester": { "equals": address } },
                { "recipient": { "equals": address } }
            ]
        },
        "orderBy": [{ "time": "desc" }]
    })
}

fn confirmation_variables(ref_uids: &[String]) -> Value {
    json!({
        "where": {
            "schemaId": { "equals": TRUST_SCHEMA_UID },
            "refUID": { "in": ref_uids }
        },
        "orderBy": [{ "time": "desc" }]
    })
}

fn ens_variables(addresses: &[String]) -> Value {
    json!({ "where": { "id": { "in": addresses, "mode": "insensitive" } } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::GraphQlStub;

    fn response(value: Value) -> IndexerResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn address_lookup_is_scoped_to_trust_schema() {
        let variables = address_variables("0xabc");
        assert_eq!(variables["where"]["schemaId"]["equals"], TRUST_SCHEMA_UID);
        assert_eq!(variables["where"]["OR"][0]["attester"]["equals"], "0xabc");
        assert_eq!(variables["where"]["OR"][1]["recipient"]["equals"], "0xabc");
        assert_eq!(variables["orderBy"][0]["time"], "desc");
    }

    #[test]
    fn confirmations_filter_by_ref_uid() {
        let variables = confirmation_variables(&["0x01".to_string(), "0x02".to_string()]);
        assert_eq!(variables["where"]["refUID"]["in"], json!(["0x01", "0x02"]));
    }

    #[test]
    fn extracts_attestation_list() {
        let parsed: Vec<IndexedAttestation> = extract(
            response(json!({ "data": { "attestations": [{
                "id": "0xuid",
                "attester": "0xa",
                "recipient": "0xb",
                "revocationTime": 0,
                "expirationTime": 0,
                "time": 1700000000,
                "data": "0x01"
            }] } })),
            "attestations",
        )
        .unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].time, 1_700_000_000);
        assert_eq!(parsed[0].attester, "0xa");
    }

    #[test]
    fn missing_attestation_is_none() {
        let parsed: Option<IndexedAttestation> =
            extract(response(json!({ "data": { "attestation": null } })), "attestation").unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn errors_and_missing_fields_surface() {
        let rejected: Result<Vec<EnsName>, _> =
            extract(response(json!({ "errors": [{ "message": "bad" }] })), "ensNames");
        assert!(matches!(rejected, Err(IndexerError::Rejected(_))));
        let missing: Result<Vec<EnsName>, _> = extract(response(json!({ "data": {} })), "ensNames");
        assert!(matches!(missing, Err(IndexerError::MissingField("ensNames"))));
    }

    #[tokio::test]
    async fn posts_query_and_variables_to_graphql_endpoint() {
        let stub = GraphQlStub::spawn(json!({ "data": { "attestation": {
            "id": "0xuid",
            "attester": "0xa",
            "recipient": "0xb",
            "time": 1700000000,
            "data": "0x01"
        } } }))
        .await;
        let indexer = AttestationIndexer::new(&stub.base_url);

        let attestation = indexer.get_attestation("0xuid").await.unwrap().unwrap();
        assert_eq!(attestation.id, "0xuid");
        assert_eq!(attestation.recipient, "0xb");

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["query"], ATTESTATION_QUERY);
        assert_eq!(requests[0]["variables"], json!({ "where": { "id": "0xuid" } }));
    }

    #[tokio::test]
    async fn ens_names_are_read_from_data() {
        let stub = GraphQlStub::spawn(json!({ "data": { "ensNames": [{ "id": "0xa", "name": "alice.eth" }] } })).await;
        let names = AttestationIndexer::new(&stub.base_url)
            .get_ens_names(&["0xA".to_string()])
            .await
            .unwrap();
        assert_eq!(names, vec![EnsName { id: "0xa".into(), name: "alice.eth".into() }]);
        assert_eq!(stub.requests()[0]["variables"]["where"]["id"]["in"], json!(["0xA"]));
    }

    #[tokio::test]
    async fn indexer_errors_are_surfaced() {
        let stub = GraphQlStub::spawn(json!({ "errors": [{ "message": "bad where" }] })).await;
        let result = AttestationIndexer::new(&stub.base_url).get_attestations_for_address("0xabc").await;
        assert!(matches!(result, Err(IndexerError::Rejected(errors)) if errors.len() == 1));
    }
}
