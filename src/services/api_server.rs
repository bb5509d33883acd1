// src/services/api_server.rs
//! API Server for the credential pipeline
//!
//! Exposes the transformation pipeline and the credential lifecycle over
//! HTTP. Built with Axum; every endpoint takes and returns JSON.
//!
//! Endpoints:
//! - Schema tools: canonical bytes and prepared values for any record/schema
//! - Passport credentials: local issuance, verification, storage
//! - Remote issuance: a challenge signed by the holder wallet, when an
//!   issuance service is configured
//! - Circuit input: limb ABI and byte views, proof generation/verification
//!
//! Errors are returned as `{ "error": "..." }` with status 400 for bad
//! input, 502 when the issuance service fails and 500 for server-side
//! failures.

use crate::error::{Error, IssuanceError, ProverError, SigningError};
use crate::models::credential::{IssuedCredential, PassportSubject};
use crate::models::record::Record;
use crate::services::credential_issuer::CredentialIssuer;
use crate::services::issuance_client::IssuanceClient;
use crate::services::verifier::Verifier;
use crate::transform::canonical::{canonical_layout, canonicalize};
use crate::transform::passport::PASSPORT_SIGN_SCHEMA;
use crate::transform::schema::Schema;
use crate::transform::walker::prepare_named;
use crate::utils::crypto::ProofType;
use crate::utils::serialization::{decode_proof, encode_proof, to_hex_prefixed};
use crate::wallet::credential_storage::CredentialStorage;
use crate::wallet::local_provider::LocalProvider;
use crate::wallet::provider::EthWalletProvider;
use crate::zkp::backend::{generate_proof, verify_proof, ProofBackend};
use crate::zkp::input::{build_zk_input, ByteZkInput, ZkInput};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

// API request and response structures

/// Record plus schema, for the schema tools
#[derive(Serialize, Deserialize)]
struct TransformRequest {
    record: Record,
    schema: Schema,
    #[serde(default)]
    proof_type: ProofType,
}

#[derive(Serialize, Deserialize)]
struct CanonicalizeResponse {
    canonical: String,
    digest: String,
    layout: Vec<(String, usize)>,
}

#[derive(Serialize, Deserialize)]
struct PreparedValue {
    path: String,
    kind: String,
    value: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct PrepareResponse {
    values: Vec<PreparedValue>,
}

/// Request payload for issuing a passport credential
#[derive(Serialize, Deserialize)]
struct IssueCredentialRequest {
    sch: u16,
    subject: PassportSubject,
}

#[derive(Serialize, Deserialize)]
struct VerifyCredentialResponse {
    is_valid: bool,
}

#[derive(Serialize, Deserialize)]
struct ZkInputRequest {
    credential: IssuedCredential,
    /// Defaults to the current time.
    current_date: Option<i64>,
}

#[derive(Serialize, Deserialize)]
struct GenerateProofResponse {
    proof: String,
}

#[derive(Serialize, Deserialize)]
struct VerifyProofRequest {
    proof: String,
}

#[derive(Serialize, Deserialize)]
struct VerifyProofResponse {
    is_valid: bool,
}

#[derive(Serialize, Deserialize)]
struct StoreCredentialRequest {
    /// Derived from the signature when absent.
    id: Option<String>,
    credential: IssuedCredential,
}

#[derive(Serialize, Deserialize)]
struct StoreCredentialResponse {
    id: String,
}

#[derive(Serialize, Deserialize)]
struct RequestCredentialRequest {
    /// Challenge handed out by the issuance service.
    challenge: String,
}

#[derive(Serialize, Deserialize)]
struct RequestCredentialResponse {
    id: String,
    credential: IssuedCredential,
}

/// Remote issuance service plus the holder wallet that signs its challenges.
pub struct RemoteIssuance {
    pub client: IssuanceClient,
    pub wallet: EthWalletProvider<LocalProvider>,
}

/// Error body with its status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }

    fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError { status, message: message.into() }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::Signing(SigningError::Failed) | Error::Prover(ProverError::Task(_)) => {
                error!("request failed: {}", err);
                ApiError::internal(err.to_string())
            }
            Error::Issuance(_) => {
                warn!("remote issuance failed: {}", err);
                ApiError::with_status(StatusCode::BAD_GATEWAY, err.to_string())
            }
            _ => ApiError::bad_request(err.to_string()),
        }
    }
}

impl From<ProverError> for ApiError {
    fn from(err: ProverError) -> Self {
        Error::from(err).into()
    }
}

impl From<IssuanceError> for ApiError {
    fn from(err: IssuanceError) -> Self {
        Error::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// API server state containing all service dependencies
pub struct ApiServer {
    /// Local passport issuer
    credential_issuer: Arc<CredentialIssuer>,

    /// Signature verifier
    verifier: Arc<Verifier>,

    /// Proof engine behind /generate-proof and /verify-proof
    backend: Arc<dyn ProofBackend>,

    /// Holder-side credential store
    storage: Arc<Mutex<CredentialStorage>>,

    /// Remote issuer behind /request-credential, if configured
    remote_issuance: Option<Arc<RemoteIssuance>>,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `credential_issuer` - Service for credential issuance
    /// * `verifier` - Service for credential verification
    /// * `backend` - Proof engine
    pub fn new(credential_issuer: CredentialIssuer, verifier: Verifier, backend: Arc<dyn ProofBackend>) -> Self {
        ApiServer {
            credential_issuer: Arc::new(credential_issuer),
            verifier: Arc::new(verifier),
            backend,
            storage: Arc::new(Mutex::new(CredentialStorage::new())),
            remote_issuance: None,
        }
    }

    /// Enables /request-credential against a remote issuance service.
    pub fn with_remote_issuance(mut self, client: IssuanceClient, wallet: EthWalletProvider<LocalProvider>) -> Self {
        self.remote_issuance = Some(Arc::new(RemoteIssuance { client, wallet }));
        self
    }

    /// All routes, with permissive CORS for browser front-ends.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/canonicalize", post(Self::canonicalize_handler))
            .route("/prepare", post(Self::prepare_handler))
            .route("/issue-credential", post(Self::issue_credential_handler))
            .route("/verify-credential", post(Self::verify_credential_handler))
            .route("/request-credential", post(Self::request_credential_handler))
            .route("/zk-input", post(Self::zk_input_handler))
            .route("/zk-input-bytes", post(Self::zk_input_bytes_handler))
            .route("/generate-proof", post(Self::generate_proof_handler))
            .route("/verify-proof", post(Self::verify_proof_handler))
            .route("/store-credential", post(Self::store_credential_handler))
            .route("/get-credential/:id", get(Self::get_credential_handler))
            .route("/credential/:id", delete(Self::delete_credential_handler))
            .route("/count-credentials", get(Self::count_credentials_handler))
            .layer(CorsLayer::permissive())
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and serves until the listener fails
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router()).await
    }

    fn lock_storage(&self) -> Result<std::sync::MutexGuard<'_, CredentialStorage>, ApiError> {
        self.storage
            .lock()
            .map_err(|_| ApiError::internal("credential storage is unavailable"))
    }

    // =====================
    // Schema tools
    // =====================

    /// Canonical bytes, digest and field layout of a record
    ///
    /// # Endpoint
    /// POST /canonicalize
    ///
    /// # Responses
    /// - 200 OK: `0x` hex canonical bytes and digest, `(path, length)` layout
    /// - 400 Bad Request: schema/record mismatch or encoding failure
    async fn canonicalize_handler(
        Json(payload): Json<TransformRequest>,
    ) -> Result<Json<CanonicalizeResponse>, ApiError> {
        let canonical = canonicalize(&payload.record, &payload.schema).map_err(Error::from)?;
        let layout = canonical_layout(&payload.record, &payload.schema).map_err(Error::from)?;
        Ok(Json(CanonicalizeResponse {
            digest: to_hex_prefixed(&payload.proof_type.digest(&canonical)),
            canonical: to_hex_prefixed(&canonical),
            layout,
        }))
    }

    /// Prepared values of a record, in schema order
    ///
    /// # Endpoint
    /// POST /prepare
    async fn prepare_handler(Json(payload): Json<TransformRequest>) -> Result<Json<PrepareResponse>, ApiError> {
        let prepared = prepare_named(&payload.record, &payload.schema).map_err(Error::from)?;
        let values = prepared
            .iter()
            .map(|(path, value)| PreparedValue {
                path: path.to_string(),
                kind: value.kind().to_string(),
                value: value.to_json(),
            })
            .collect();
        Ok(Json(PrepareResponse { values }))
    }

    // =====================
    // Credential Handlers
    // =====================

    /// Issues and signs a passport credential dated now
    ///
    /// # Endpoint
    /// POST /issue-credential
    async fn issue_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<IssueCredentialRequest>,
    ) -> Result<Json<IssuedCredential>, ApiError> {
        let issued = state.credential_issuer.issue(payload.sch, payload.subject)?;
        Ok(Json(issued))
    }

    /// Checks the signature (against the embedded issuer key) and expiry
    ///
    /// # Endpoint
    /// POST /verify-credential
    async fn verify_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<IssuedCredential>,
    ) -> Result<Json<VerifyCredentialResponse>, ApiError> {
        let is_valid = state.verifier.verify_at(&payload, Utc::now().timestamp_millis())?;
        Ok(Json(VerifyCredentialResponse { is_valid }))
    }

    /// Requests a credential from the remote issuance service
    ///
    /// The holder wallet signs the challenge; the returned credential is
    /// verified and stored under its derived id.
    ///
    /// # Endpoint
    /// POST /request-credential
    ///
    /// # Responses
    /// - 200 OK: `{ id, credential }`
    /// - 502 Bad Gateway: the service or wallet failed, or the credential
    ///   does not verify
    /// - 503 Service Unavailable: no issuance service configured
    async fn request_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<RequestCredentialRequest>,
    ) -> Result<Json<RequestCredentialResponse>, ApiError> {
        let Some(remote) = state.remote_issuance.clone() else {
            return Err(ApiError::with_status(
                StatusCode::SERVICE_UNAVAILABLE,
                "no issuance service configured",
            ));
        };

        remote.wallet.connect().await.map_err(IssuanceError::from)?;
        let credential = remote.client.issue_with_wallet(&remote.wallet, &payload.challenge).await?;

        if !state.verifier.verify_at(&credential, Utc::now().timestamp_millis())? {
            return Err(ApiError::with_status(
                StatusCode::BAD_GATEWAY,
                "issuance service returned a credential that does not verify",
            ));
        }
        let id = state.lock_storage()?.store_issued(credential.clone());
        info!("stored remotely issued credential {}", id);
        Ok(Json(RequestCredentialResponse { id, credential }))
    }

    async fn store_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<StoreCredentialRequest>,
    ) -> Result<Json<StoreCredentialResponse>, ApiError> {
        let mut storage = state.lock_storage()?;
        let id = match payload.id {
            Some(id) if storage.contains_credential(&id) => {
                return Err(ApiError::with_status(
                    StatusCode::CONFLICT,
                    format!("credential {} already exists", id),
                ));
            }
            Some(id) => {
                storage.store_credential(id.clone(), payload.credential);
                id
            }
            None => storage.store_issued(payload.credential),
        };
        Ok(Json(StoreCredentialResponse { id }))
    }

    async fn get_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> Result<Json<IssuedCredential>, ApiError> {
        let storage = state.lock_storage()?;
        match storage.get_credential(&id) {
            Some(credential) => Ok(Json(credential.clone())),
            None => Err(ApiError {
                status: StatusCode::NOT_FOUND,
                message: format!("no credential with id {}", id),
            }),
        }
    }

    /// Removes a stored credential
    ///
    /// # Endpoint
    /// DELETE /credential/:id
    ///
    /// # Responses
    /// - 204 No Content: removed
    /// - 404 Not Found: no credential with that id
    async fn delete_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Path(id): Path<String>,
    ) -> Result<StatusCode, ApiError> {
        if state.lock_storage()?.remove_credential(&id) {
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(ApiError::with_status(StatusCode::NOT_FOUND, format!("no credential with id {}", id)))
        }
    }

    async fn count_credentials_handler(State(state): State<Arc<ApiServer>>) -> impl IntoResponse {
        match state.lock_storage() {
            Ok(storage) => (StatusCode::OK, Json(json!({ "count": storage.count_credentials() }))).into_response(),
            Err(e) => e.into_response(),
        }
    }

    // =====================
    // ZKP Handlers
    // =====================

    /// Circuit ABI input for an issued credential
    ///
    /// # Endpoint
    /// POST /zk-input
    async fn zk_input_handler(Json(payload): Json<ZkInputRequest>) -> Result<Json<ZkInput>, ApiError> {
        let current_date = payload.current_date.unwrap_or_else(|| Utc::now().timestamp_millis());
        let input = build_zk_input(&payload.credential.credential, &payload.credential.proof.signature, current_date)
            .map_err(Error::from)?;
        Ok(Json(input))
    }

    /// Byte-level circuit input: the canonical bytes cut into fields
    ///
    /// # Endpoint
    /// POST /zk-input-bytes
    async fn zk_input_bytes_handler(Json(payload): Json<IssuedCredential>) -> Result<Json<ByteZkInput>, ApiError> {
        let canonical = canonicalize(&payload.credential.to_record(), &PASSPORT_SIGN_SCHEMA).map_err(Error::from)?;
        let input = ByteZkInput::from_canonical(&canonical, &payload.proof.signature).map_err(Error::from)?;
        Ok(Json(input))
    }

    /// Generates a proof for a circuit input
    ///
    /// # Endpoint
    /// POST /generate-proof
    ///
    /// # Responses
    /// - 200 OK: base64 proof blob
    /// - 400 Bad Request: the statement does not hold
    async fn generate_proof_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<ZkInput>,
    ) -> Result<Json<GenerateProofResponse>, ApiError> {
        let proof = generate_proof(state.backend.clone(), payload).await?;
        Ok(Json(GenerateProofResponse { proof: encode_proof(&proof) }))
    }

    /// Verifies a base64 proof blob
    ///
    /// # Endpoint
    /// POST /verify-proof
    async fn verify_proof_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<VerifyProofRequest>,
    ) -> Result<Json<VerifyProofResponse>, ApiError> {
        let proof = decode_proof(&payload.proof).map_err(ApiError::bad_request)?;
        let is_valid = verify_proof(state.backend.clone(), proof).await?;
        Ok(Json(VerifyProofResponse { is_valid }))
    }
}

// Implement Clone for ApiServer to use with Axum's State
impl Clone for ApiServer {
    fn clone(&self) -> Self {
        ApiServer {
            credential_issuer: Arc::clone(&self.credential_issuer),
            verifier: Arc::clone(&self.verifier),
            backend: Arc::clone(&self.backend),
            storage: Arc::clone(&self.storage),
            remote_issuance: self.remote_issuance.clone(),
        }
    }
}
