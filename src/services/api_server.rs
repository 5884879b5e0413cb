// src/services/api_server.rs
//! API Server for trust claims
//!
//! REST interface over the claim pipeline, the query console and the
//! attestation indexer. Built on Axum; every handler returns JSON and never
//! panics on request data.
//!
//! Endpoints:
//! - Signed-credential submission (`/api/create`, `/api/create-jwt`,
//!   `/api/create-attest`), issued by the `SECRET_KEY` session
//! - Latest-claim queries (`/api/query`, `/api/query-jws`, `/api/query/:preset`)
//! - Full claim creation (`/api/claims`)
//! - Ad hoc queries (`/api/graphql`)
//! - Attestation lookups (`/api/attestations`, `/api/ens-names`)

use crate::blockchain::eas::recover_attester;
use crate::blockchain::indexer::{AttestationIndexer, IndexerError};
use crate::graphql::Mutation;
use crate::models::credential::Credential;
use crate::models::schema::ClaimVariant;
use crate::services::claim_pipeline::{ClaimError, ClaimOutcome, ClaimPipeline, ClaimRequest};
use crate::services::query_console::{PresetQuery, QueryConsole};
use crate::storage::{ServiceError, SubmissionClient};
use crate::utils::crypto::format_address;
use crate::wallet::{KeySession, Session};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Source of the issuing seed, consulted on every request.
pub type SecretSource = Arc<dyn Fn() -> Option<String> + Send + Sync>;

// API request structures

/// Body of the signed-credential routes.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedCredentialRequest {
    to_json: Value,
}

#[derive(Serialize, Deserialize)]
struct GraphQlRequest {
    query: String,
}

#[derive(Serialize, Deserialize)]
struct AddressQuery {
    address: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationsRequest {
    ref_uids: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct EnsNamesRequest {
    addresses: Vec<String>,
}

/// Main API server structure holding all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    /// Client for the remote document service
    client: SubmissionClient,

    /// Build/sign/format/submit orchestration
    pipeline: Arc<ClaimPipeline>,

    /// Read-only query passthrough
    console: Arc<QueryConsole>,

    /// EAS indexer client
    indexer: Arc<AttestationIndexer>,

    /// Wallet session from `PRIVATE_KEY`, used for attestations
    wallet: Option<Session>,

    /// Reads `SECRET_KEY`
    secret: SecretSource,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `client` - Shared client for the remote document service
    /// * `indexer` - Attestation indexer client
    /// * `wallet` - Optional wallet session for attestations
    /// * `secret` - Source of the issuing seed
    pub fn new(
        client: SubmissionClient,
        indexer: AttestationIndexer,
        wallet: Option<Session>,
        secret: SecretSource,
    ) -> Self {
        ApiServer {
            pipeline: Arc::new(ClaimPipeline::new(client.clone())),
            console: Arc::new(QueryConsole::new(client.clone())),
            client,
            indexer: Arc::new(indexer),
            wallet,
            secret,
        }
    }

    /// Configures all API routes
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/api/create", post(Self::create_eip712_handler))
            .route("/api/create-jwt", post(Self::create_jwt_handler))
            .route("/api/create-attest", post(Self::create_attest_handler))
            .route("/api/query", get(Self::query_eip712_handler))
            .route("/api/query-jws", get(Self::query_jws_handler))
            .route("/api/query/:preset", get(Self::query_preset_handler))
            .route("/api/claims", post(Self::create_claim_handler))
            .route("/api/graphql", post(Self::graphql_handler))
            .route("/api/attestations", get(Self::attestations_for_address_handler))
            .route("/api/attestations/confirmations", post(Self::confirmations_handler))
            .route("/api/attestations/:uid", get(Self::attestation_handler))
            .route("/api/ens-names", post(Self::ens_names_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    pub async fn run(self, addr: SocketAddr) -> std::io::Result<()> {
        let app = Arc::new(self).router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", addr);
        axum::serve(listener, app).await
    }

    /// The issuing session, if `SECRET_KEY` is currently set.
    fn key_session(&self) -> Option<Result<Session, String>> {
        let seed = (self.secret)()?;
        Some(
            KeySession::from_hex_seed(&seed)
                .map(Session::new)
                .map_err(|e| e.to_string()),
        )
    }

    /// Session used for `/api/claims`: the wallet for attestations, the
    /// issuing key (falling back to the wallet) for everything else.
    fn claim_session(&self, variant: ClaimVariant) -> Result<Option<Session>, String> {
        if variant == ClaimVariant::Attestation {
            return Ok(self.wallet.clone());
        }
        match self.key_session() {
            Some(session) => session.map(Some),
            None => Ok(self.wallet.clone()),
        }
    }

    // =====================
    // Signed-credential submission
    // =====================

    /// Submits a credential the caller already signed.
    ///
    /// The remote response is returned as-is, including GraphQL errors.
    /// Without `SECRET_KEY` nothing is sent and the body is empty. Every
    /// other failure is a 200 with `{err}`.
    async fn submit_signed(&self, expected: ClaimVariant, to_json: Value) -> Response {
        let session = match self.key_session() {
            None => {
                warn!("SECRET_KEY is not set; {} submission skipped", expected);
                return (StatusCode::OK, String::new()).into_response();
            }
            Some(Err(e)) => return err_response(StatusCode::OK, e),
            Some(Ok(session)) => session,
        };

        let credential: Credential = match serde_json::from_value(to_json) {
            Ok(credential) => credential,
            Err(e) => return err_response(StatusCode::OK, e),
        };
        if credential.variant() != expected {
            return err_response(
                StatusCode::OK,
                format!("expected a {} credential, got {}", expected, credential.variant()),
            );
        }
        if let Err(e) = check_attester(&credential) {
            return err_response(StatusCode::OK, e);
        }
        let mutation = match Mutation::for_credential(&credential) {
            Ok(mutation) => mutation,
            Err(e) => return err_response(StatusCode::OK, e),
        };

        match self.client.submit(&session, &mutation).await {
            Ok(document) => (StatusCode::OK, Json(document.response)).into_response(),
            Err(ServiceError::Rejected(errors)) => {
                (StatusCode::OK, Json(json!({ "errors": errors }))).into_response()
            }
            Err(e) => {
                error!("{} submission failed: {}", expected, e);
                err_response(StatusCode::OK, e)
            }
        }
    }

    /// # Endpoint
    /// POST /api/create
    ///
    /// # Request Body
    /// `{toJson}`: a signed EIP-712 credential
    async fn create_eip712_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<SignedCredentialRequest>,
    ) -> Response {
        state.submit_signed(ClaimVariant::Eip712, payload.to_json).await
    }

    /// # Endpoint
    /// POST /api/create-jwt
    async fn create_jwt_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<SignedCredentialRequest>,
    ) -> Response {
        state.submit_signed(ClaimVariant::Jwt, payload.to_json).await
    }

    /// # Endpoint
    /// POST /api/create-attest
    ///
    /// # Request Body
    /// `{toJson}`: a signed off-chain attestation with its `account`
    async fn create_attest_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<SignedCredentialRequest>,
    ) -> Response {
        state.submit_signed(ClaimVariant::Attestation, payload.to_json).await
    }

    // =====================
    // Queries
    // =====================

    async fn preset(&self, preset: PresetQuery) -> Response {
        match self.console.preset(preset).await {
            Ok(response) => (StatusCode::OK, Json(response)).into_response(),
            Err(e) => err_response(StatusCode::BAD_GATEWAY, e),
        }
    }

    /// # Endpoint
    /// GET /api/query
    ///
    /// # Responses
    /// - 200 OK: latest EIP-712 credential query result
    /// - 502 Bad Gateway: `{err}`
    async fn query_eip712_handler(State(state): State<Arc<ApiServer>>) -> Response {
        state.preset(PresetQuery::LatestEip712Credential).await
    }

    /// # Endpoint
    /// GET /api/query-jws
    async fn query_jws_handler(State(state): State<Arc<ApiServer>>) -> Response {
        state.preset(PresetQuery::LatestJwsCredential).await
    }

    /// # Endpoint
    /// GET /api/query/:preset
    ///
    /// `preset` is one of `latest-verifiable-claim`, `latest-base-trust`,
    /// `latest-attestation`, `latest-eip712-credential`,
    /// `latest-jws-credential`.
    async fn query_preset_handler(
        Path(preset): Path<PresetQuery>,
        State(state): State<Arc<ApiServer>>,
    ) -> Response {
        state.preset(preset).await
    }

    /// Runs an ad hoc query through the console
    ///
    /// # Endpoint
    /// POST /api/graphql
    ///
    /// # Responses
    /// - 200 OK: `{data}`, `data` null for introspection or empty results
    /// - 502 Bad Gateway: `{err}`
    async fn graphql_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<GraphQlRequest>,
    ) -> Response {
        match state.console.fetch(&payload.query).await {
            Ok(data) => (StatusCode::OK, Json(json!({ "data": data }))).into_response(),
            Err(e) => err_response(StatusCode::BAD_GATEWAY, e),
        }
    }

    // =====================
    // Claim creation
    // =====================

    /// Builds, signs and submits a claim with the server's session
    ///
    /// # Endpoint
    /// POST /api/claims
    ///
    /// # Request Body
    /// `{recipient, variant}`, variant one of `eip712`, `jwt`, `base-trust`,
    /// `attestation`
    ///
    /// # Responses
    /// - 200 OK: `{credential, document}`
    /// - 428 Precondition Required: no session for this variant
    /// - 422 Unprocessable Entity: the remote service rejected the claim
    /// - 502 Bad Gateway: remote service unreachable
    async fn create_claim_handler(
        State(state): State<Arc<ApiServer>>,
        Json(request): Json<ClaimRequest>,
    ) -> Response {
        let session = match state.claim_session(request.variant) {
            Ok(session) => session,
            Err(e) => return err_response(StatusCode::INTERNAL_SERVER_ERROR, e),
        };
        match state.pipeline.create_claim(session.as_ref(), &request).await {
            Ok(ClaimOutcome::NotReady) => (
                StatusCode::PRECONDITION_REQUIRED,
                Json(json!({ "status": "not_ready" })),
            )
                .into_response(),
            Ok(ClaimOutcome::Submitted { credential, document }) => (
                StatusCode::OK,
                Json(json!({ "credential": credential, "document": document.document })),
            )
                .into_response(),
            Err(ClaimError::Service(ServiceError::Rejected(errors))) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "err": "rejected by remote service", "errors": errors })),
            )
                .into_response(),
            Err(e @ ClaimError::Service(_)) => err_response(StatusCode::BAD_GATEWAY, e),
            Err(e) => {
                error!("{} claim failed: {}", request.variant, e);
                err_response(StatusCode::INTERNAL_SERVER_ERROR, e)
            }
        }
    }

    // =====================
    // Attestation lookups
    // =====================

    /// # Endpoint
    /// GET /api/attestations/:uid
    ///
    /// # Responses
    /// - 200 OK: the indexed attestation
    /// - 404 Not Found: unknown UID
    async fn attestation_handler(
        Path(uid): Path<String>,
        State(state): State<Arc<ApiServer>>,
    ) -> Response {
        match state.indexer.get_attestation(&uid).await {
            Ok(Some(attestation)) => (StatusCode::OK, Json(json!(attestation))).into_response(),
            Ok(None) => err_response(StatusCode::NOT_FOUND, format!("no attestation {}", uid)),
            Err(e) => indexer_error(e),
        }
    }

    /// # Endpoint
    /// GET /api/attestations?address=0x..
    async fn attestations_for_address_handler(
        Query(query): Query<AddressQuery>,
        State(state): State<Arc<ApiServer>>,
    ) -> Response {
        match state.indexer.get_attestations_for_address(&query.address).await {
            Ok(attestations) => (StatusCode::OK, Json(json!(attestations))).into_response(),
            Err(e) => indexer_error(e),
        }
    }

    /// # Endpoint
    /// POST /api/attestations/confirmations
    async fn confirmations_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<ConfirmationsRequest>,
    ) -> Response {
        match state
            .indexer
            .get_confirmation_attestations_for_uids(&payload.ref_uids)
            .await
        {
            Ok(attestations) => (StatusCode::OK, Json(json!(attestations))).into_response(),
            Err(e) => indexer_error(e),
        }
    }

    /// # Endpoint
    /// POST /api/ens-names
    async fn ens_names_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<EnsNamesRequest>,
    ) -> Response {
        match state.indexer.get_ens_names(&payload.addresses).await {
            Ok(names) => (StatusCode::OK, Json(json!(names))).into_response(),
            Err(e) => indexer_error(e),
        }
    }
}

/// A signed attestation must recover to the account it names.
fn check_attester(credential: &Credential) -> Result<(), String> {
    let Credential::Attestation(attestation) = credential else {
        return Ok(());
    };
    let recovered = recover_attester(attestation).map_err(|e| e.to_string())?;
    match (recovered, attestation.account.as_deref()) {
        (Some(address), Some(account)) if format_address(&address) == account.to_lowercase() => Ok(()),
        (Some(address), Some(account)) => Err(format!(
            "attestation signed by {}, not {}",
            format_address(&address),
            account
        )),
        _ => Ok(()),
    }
}

fn err_response(status: StatusCode, err: impl ToString) -> Response {
    (status, Json(json!({ "err": err.to_string() }))).into_response()
}

fn indexer_error(e: IndexerError) -> Response {
    warn!("Indexer request failed: {}", e);
    err_response(StatusCode::BAD_GATEWAY, e)
}
