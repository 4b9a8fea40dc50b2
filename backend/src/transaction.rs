//! Route handlers for creating, listing, updating, and deleting a user's
//! transactions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use common::{DatabaseID, NewTransaction, Transaction, TransactionType};
use serde::Deserialize;

use crate::{
    auth::Claims,
    config::AppConfig,
    db::{Delete, Insert, SelectBy, TransactionData, TransactionFilter, TransactionUpdate, Update},
    AppError,
};

/// The optional query parameters of the transaction listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionListParams {
    /// Only return transactions of this type.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Only return transactions whose name contains this substring
    /// (case-insensitive).
    pub search: Option<String>,
}

/// A route handler for listing the authenticated user's transactions, newest
/// first.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_transactions(
    State(state): State<AppConfig>,
    claims: Claims,
    Query(params): Query<TransactionListParams>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let filter = TransactionFilter {
        transaction_type: params.transaction_type,
        search: params.search,
        ..TransactionFilter::for_user(claims.sub)
    };

    let transactions = Transaction::select(&filter, &state.db_connection().lock().unwrap())?;

    Ok(Json(transactions))
}

/// A route handler for creating a new transaction owned by the authenticated
/// user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_transaction(
    State(state): State<AppConfig>,
    claims: Claims,
    Json(new_transaction): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let transaction = TransactionData::new(new_transaction, claims.sub)
        .insert(&state.db_connection().lock().unwrap())?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// A route handler for getting a transaction by its database ID.
///
/// This function will return the status code 404 if the requested resource
/// does not exist or belongs to another user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_transaction(
    State(state): State<AppConfig>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<Json<Transaction>, AppError> {
    let transaction =
        Transaction::select(transaction_id, &state.db_connection().lock().unwrap())?;

    if transaction.user_id() != claims.sub {
        // Respond with 404 not found so that unauthorized users cannot know
        // whether another user's resource exists.
        return Err(AppError::NotFound);
    }

    Ok(Json(transaction))
}

/// A route handler for overwriting an existing transaction.
///
/// This function will return the status code 404 if the requested resource
/// does not exist or belongs to another user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_transaction(
    State(state): State<AppConfig>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
    Json(new_transaction): Json<NewTransaction>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = TransactionUpdate::new(transaction_id, new_transaction, claims.sub)
        .update(&state.db_connection().lock().unwrap())?;

    Ok(Json(transaction))
}

/// A route handler for deleting a transaction.
///
/// This function will return the status code 404 if the requested resource
/// does not exist or belongs to another user, and 204 on success.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_transaction(
    State(state): State<AppConfig>,
    claims: Claims,
    Path(transaction_id): Path<DatabaseID>,
) -> Result<StatusCode, AppError> {
    Transaction::delete(
        (transaction_id, claims.sub),
        &state.db_connection().lock().unwrap(),
    )?;

    Ok(StatusCode::NO_CONTENT)
}
