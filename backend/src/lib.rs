//! The HTTP service for the personal finance tracker.
//!
//! This library provides a JSON REST API that the mobile app talks to:
//! token-based authentication, transaction CRUD, and the profile and chart
//! data endpoints. Domain types and the chart/statistics logic live in the
//! `common` crate; this crate owns the SQLite persistence layer and the axum
//! routing around it.

use std::time::Duration;

use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;

use crate::db::DbError;

pub mod auth;
mod config;
pub mod db;
mod profile;
mod transaction;

/// Return a router with all the app's routes.
pub fn build_router() -> Router<AppConfig> {
    Router::new()
        .route("/", get(|| async { StatusCode::IM_A_TEAPOT }))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::sign_in))
        .route(
            "/transactions",
            get(transaction::get_transactions).post(transaction::create_transaction),
        )
        .route(
            "/transactions/:transaction_id",
            get(transaction::get_transaction)
                .put(transaction::update_transaction)
                .delete(transaction::delete_transaction),
        )
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/profile/chart-data", get(profile::get_chart_data))
        .layer(TraceLayer::new_for_http())
}

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down
/// gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that route handlers report to the client.
#[derive(Debug)]
pub enum AppError {
    /// An error occurred in a third-party library.
    InternalError,
    /// A registration request could not be fulfilled (weak password, taken
    /// username or email). The description is safe to show to the client.
    Registration(String),
    /// The requested resource was not found. The client should check that the
    /// parameters (e.g., ID) are correct and that the resource has been
    /// created.
    NotFound,
    /// An error occurred while accessing the application's database.
    DatabaseError(DbError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            AppError::Registration(description) => (StatusCode::BAD_REQUEST, description),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "The requested resource could not be found.".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound => AppError::NotFound,
            e => {
                tracing::error!("{e:?}");
                AppError::DatabaseError(e)
            }
        }
    }
}
