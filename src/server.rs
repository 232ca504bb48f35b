//! The HTTP service exposing account deletion.
//!
//! `POST /delete-user-account` with `Authorization: Bearer <token>` deletes the account that owns
//! the token. Responses are JSON: `{"success": true, "message": ...}` on success, `{"error": ...}`
//! otherwise. Cross-origin callers are allowed from anywhere.

use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{
        HeaderMap, HeaderName, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::account::{DeleteAccountError, delete_account_for_token};
use crate::auth::IdentityProvider;
use crate::config::Settings;
use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub identity: IdentityProvider,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            identity: IdentityProvider::new(db),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No authorization header")]
    MissingAuthorization,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    DeletionFailed(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MissingAuthorization | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::DeletionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<DeleteAccountError> for ApiError {
    fn from(e: DeleteAccountError) -> Self {
        match e {
            DeleteAccountError::Unauthorized => ApiError::Unauthorized,
            other => ApiError::DeletionFailed(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Pulls the bearer token out of the `Authorization` header.
fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::MissingAuthorization)?;

    let value = value.to_str().map_err(|_| ApiError::Unauthorized)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthorized)
}

pub async fn delete_account_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DeleteAccountResponse>, ApiError> {
    let token = bearer_token(&headers)?;

    let identity = state.identity.clone();
    let result = tokio::task::spawn_blocking(move || delete_account_for_token(&identity, &token))
        .await
        .map_err(|e| {
            error!("Delete account task failed: {e}");
            ApiError::DeletionFailed("Failed to delete account".to_string())
        })?;

    match result {
        Ok(_) => Ok(Json(DeleteAccountResponse {
            success: true,
            message: "Account deleted successfully",
        })),
        Err(e) => {
            warn!("Delete account error: {e}");
            Err(e.into())
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/delete-user-account", post(delete_account_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(settings: Settings) -> anyhow::Result<()> {
    info!("Opening database {}", settings.database_url);
    let db = Database::open(&settings.database_url)?;

    let app = build_router(AppState::new(db));

    let address = settings.server_address();
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
