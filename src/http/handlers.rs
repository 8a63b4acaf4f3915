//! Session API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blockchain::types::TransactionStatusRecord;
use crate::http::server::AppState;
use crate::verification::SessionHandle;

/// Body of `POST /api/v1/verifications`.
#[derive(Debug, Deserialize)]
pub struct CreateVerification {
    pub transaction_id: String,
    pub network: String,
}

/// What the host shows for one session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub transaction_id: String,
    pub network: String,
    pub phase: &'static str,
    pub attempts: u32,
    pub status: TransactionStatusRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_link: Option<String>,
}

impl SessionView {
    pub fn new(handle: &SessionHandle) -> Self {
        let session = handle.snapshot();
        let query = session.query();

        Self {
            id: handle.id(),
            transaction_id: query.transaction_id.clone(),
            network: query.network.clone(),
            phase: session.state().phase(),
            attempts: session.attempts_made(),
            status: session.last_status().clone(),
            explorer_link: handle.explorer_link().map(|link| link.to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub networks: usize,
    pub verifying: usize,
    pub finished: usize,
}

#[derive(Serialize)]
pub struct NetworkList {
    pub networks: Vec<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let (verifying, finished) = state.sessions.summary();
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        networks: state.tracker.load().registry().len(),
        verifying,
        finished,
    })
}

pub async fn list_networks(State(state): State<AppState>) -> Json<NetworkList> {
    let tracker = state.tracker.load();
    Json(NetworkList {
        networks: tracker
            .registry()
            .networks()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

/// Start a session.
///
/// Unsupported networks still produce a session, already failed, and
/// answer 422 so the caller can render the failure record.
pub async fn create_verification(
    State(state): State<AppState>,
    Json(body): Json<CreateVerification>,
) -> Response {
    let transaction_id = body.transaction_id.trim().to_string();
    if transaction_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "transaction_id must not be empty");
    }

    let tracker = state.tracker.load_full();
    let supported = tracker.registry().resolve(&body.network).is_ok();

    let tx = transaction_id.clone();
    let handle = tracker.start(
        transaction_id,
        body.network,
        |record| {
            tracing::info!(block_number = ?record.block_number, "Payment confirmed");
        },
        move |record| {
            tracing::warn!(tx = %tx, detail = ?record.error_detail, "Payment not confirmed");
        },
    );
    state.sessions.insert(handle.clone());

    let view = SessionView::new(&handle);
    let status = if supported {
        StatusCode::CREATED
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(view)).into_response()
}

pub async fn get_verification(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.sessions.get(&id) {
        Some(handle) => Json(SessionView::new(&handle)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Unknown session {id}")),
    }
}

/// Cancel and forget a session.
pub async fn cancel_verification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    if state.sessions.cancel(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, format!("Unknown session {id}"))
    }
}
