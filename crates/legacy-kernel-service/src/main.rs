use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use legacy_kernel_api::{
    ChatRequest, ChatResult, DigitalLegacyApi, MintRequest, WillNotFound, API_CONTRACT_VERSION,
};
use legacy_kernel_store_memory::MemoryStore;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SERVICE_CONTRACT_VERSION: &str = "service.v1";

#[derive(Debug, Clone)]
struct ServiceState {
    api: DigitalLegacyApi,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    api_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    #[serde(skip)]
    status: StatusCode,
    service_contract_version: &'static str,
    error: String,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Parser)]
#[command(name = "legacy-kernel-service")]
#[command(about = "Local HTTP service for the Digital Legacy Protocol")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:4020")]
    bind: SocketAddr,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl ServiceError {
    fn from_api(err: &anyhow::Error) -> Self {
        let status = if err.downcast_ref::<WillNotFound>().is_some() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_REQUEST
        };
        Self {
            status,
            service_contract_version: SERVICE_CONTRACT_VERSION,
            error: err.to_string(),
        }
    }
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope {
        service_contract_version: SERVICE_CONTRACT_VERSION,
        api_contract_version: API_CONTRACT_VERSION,
        data,
    }
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/wills/mint", post(wills_mint))
        .route("/v1/wills/chat", post(wills_chat))
        .route("/v1/wills", get(wills_list))
        .route("/v1/wills/:address", get(wills_show))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let state = ServiceState { api: DigitalLegacyApi::new(MemoryStore::new()) };
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!(bind = %args.bind, "digital legacy protocol service listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health() -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse { status: "ok" }))
}

async fn wills_mint(
    State(state): State<ServiceState>,
    Json(request): Json<MintRequest>,
) -> Result<Json<ServiceEnvelope<legacy_kernel_core::WillRecord>>, ServiceError> {
    let record = state.api.mint(request).map_err(|err| ServiceError::from_api(&err))?;
    info!(address = %record.address, subject = %record.subject, "minted digital will");
    Ok(Json(envelope(record)))
}

async fn wills_chat(
    State(state): State<ServiceState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ServiceEnvelope<ChatResult>>, ServiceError> {
    let turn = state.api.chat(request).map_err(|err| ServiceError::from_api(&err))?;
    info!(address = %turn.address, "answered avatar query");
    Ok(Json(envelope(turn)))
}

async fn wills_show(
    State(state): State<ServiceState>,
    Path(address): Path<String>,
) -> Result<Json<ServiceEnvelope<legacy_kernel_core::WillRecord>>, ServiceError> {
    let record = state.api.will_show(&address).map_err(|err| ServiceError::from_api(&err))?;
    Ok(Json(envelope(record)))
}

async fn wills_list(
    State(state): State<ServiceState>,
) -> Result<Json<ServiceEnvelope<Vec<legacy_kernel_core::WillRecord>>>, ServiceError> {
    let records = state.api.will_list().map_err(|err| ServiceError::from_api(&err))?;
    Ok(Json(envelope(records)))
}
