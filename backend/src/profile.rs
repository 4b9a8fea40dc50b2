//! Route handlers for the user's profile and the chart data derived from
//! their transaction history.

use axum::{extract::State, Json};
use chrono::NaiveDate;
use common::{
    chart::{chart_data, ChartData},
    stats::UserStats,
    Email, Transaction, User, UserID,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::Claims,
    config::AppConfig,
    db::{ProfileUpdate, SelectBy, SortOrder, TransactionFilter, Update},
    AppError,
};

/// The identity fields of a user's profile, as sent to the client.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub id: UserID,
    pub name: String,
    pub email: Email,
    pub join_date: NaiveDate,
    pub profile_image: Option<String>,
}

impl From<&User> for ProfileFields {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            name: user.name().to_string(),
            email: user.email().clone(),
            join_date: user.join_date(),
            profile_image: user.profile_image().map(str::to_string),
        }
    }
}

/// The response to a profile request: identity fields plus lifetime
/// statistics.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: ProfileFields,
    pub stats: UserStats,
}

/// The payload of a profile update request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateData {
    pub name: String,
    pub email: Email,
    pub profile_image: Option<String>,
}

/// A route handler for fetching the authenticated user's profile and
/// statistics.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_profile(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<Json<ProfileResponse>, AppError> {
    let (user, transactions) = {
        let connection = state.db_connection().lock().unwrap();
        let user = User::select(claims.sub, &connection)?;
        let transactions =
            Transaction::select(&TransactionFilter::for_user(claims.sub), &connection)?;

        (user, transactions)
    };

    // The statistics are recomputed from the full transaction list on every
    // request; nothing is cached.
    let stats = UserStats::from_transactions(&transactions);

    Ok(Json(ProfileResponse {
        profile: ProfileFields::from(&user),
        stats,
    }))
}

/// A route handler for updating the authenticated user's name, email, and
/// profile image.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_profile(
    State(state): State<AppConfig>,
    claims: Claims,
    Json(update): Json<ProfileUpdateData>,
) -> Result<Json<ProfileFields>, AppError> {
    let user = ProfileUpdate {
        user_id: claims.sub,
        name: update.name,
        email: update.email,
        profile_image: update.profile_image,
    }
    .update(&state.db_connection().lock().unwrap())?;

    Ok(Json(ProfileFields::from(&user)))
}

/// A route handler for the chart data shown on the home screen.
///
/// The user's transactions are fetched oldest first and bucketed into the
/// month, week-of-month, and day-of-week views.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_chart_data(
    State(state): State<AppConfig>,
    claims: Claims,
) -> Result<Json<ChartData>, AppError> {
    let filter = TransactionFilter {
        order: SortOrder::Ascending,
        ..TransactionFilter::for_user(claims.sub)
    };

    let transactions = Transaction::select(&filter, &state.db_connection().lock().unwrap())?;

    Ok(Json(chart_data(&transactions)))
}

#[cfg(test)]
mod profile_route_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use chrono::NaiveDate;
    use common::{Amount, Email, NewTransaction, NewUser, PasswordHash, TransactionType, User};
    use rusqlite::Connection;
    use serde_json::{json, Value};

    use crate::{
        auth::encode_jwt,
        build_router,
        config::AppConfig,
        db::{initialize, Insert, TransactionData},
        profile::ProfileResponse,
    };

    fn get_test_app_config() -> AppConfig {
        let db_connection =
            Connection::open_in_memory().expect("Could not open database in memory.");
        initialize(&db_connection).expect("Could not initialize database.");

        AppConfig::new(db_connection, "foobar".to_string())
    }

    fn get_test_server_and_user(app_config: AppConfig) -> (TestServer, User, String) {
        let user = NewUser {
            username: "nick".to_string(),
            password_hash: PasswordHash::new_unchecked("notarealhash".to_string()),
            name: "Nick Demo".to_string(),
            email: Email::new("nick@example.com").unwrap(),
        }
        .insert(&app_config.db_connection().lock().unwrap())
        .unwrap();

        let token = encode_jwt(user.id(), app_config.encoding_key()).unwrap();

        let server = TestServer::new(build_router().with_state(app_config))
            .expect("Could not create test server.");

        (server, user, token)
    }

    fn insert_transaction(
        app_config: &AppConfig,
        user: &User,
        amount: f64,
        transaction_type: TransactionType,
        date: &str,
    ) {
        TransactionData::new(
            NewTransaction {
                name: "Test Transaction".to_string(),
                amount: Amount::new(amount).unwrap(),
                transaction_type,
                date: date.parse::<NaiveDate>().unwrap(),
            },
            user.id(),
        )
        .insert(&app_config.db_connection().lock().unwrap())
        .unwrap();
    }

    #[tokio::test]
    async fn get_profile_returns_identity_and_stats() {
        let app_config = get_test_app_config();
        let (server, user, token) = get_test_server_and_user(app_config.clone());

        insert_transaction(
            &app_config,
            &user,
            5_000_000.0,
            TransactionType::Income,
            "2024-03-15",
        );
        insert_transaction(
            &app_config,
            &user,
            1_500_000.0,
            TransactionType::Expense,
            "2024-03-16",
        );

        let response = server.get("/profile").authorization_bearer(token).await;

        response.assert_status_ok();

        let profile = response.json::<ProfileResponse>();
        assert_eq!(profile.profile.id, user.id());
        assert_eq!(profile.profile.name, "Nick Demo");
        assert_eq!(profile.stats.total_transactions, 2);
        assert_eq!(profile.stats.total_income, 5_000_000.0);
        assert_eq!(profile.stats.total_expenses, 1_500_000.0);
        assert_eq!(profile.stats.savings_rate, "70.0%");
    }

    #[tokio::test]
    async fn get_profile_with_no_transactions_returns_bare_zero_rate() {
        let (server, _user, token) = get_test_server_and_user(get_test_app_config());

        let response = server.get("/profile").authorization_bearer(token).await;

        response.assert_status_ok();

        let profile = response.json::<ProfileResponse>();
        assert_eq!(profile.stats.total_transactions, 0);
        assert_eq!(profile.stats.savings_rate, "0%");
    }

    #[tokio::test]
    async fn get_profile_fails_without_token() {
        let (server, _user, _token) = get_test_server_and_user(get_test_app_config());

        server
            .get("/profile")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_profile_serializes_flattened_identity_fields() {
        let (server, user, token) = get_test_server_and_user(get_test_app_config());

        let response = server.get("/profile").authorization_bearer(token).await;

        response.assert_status_ok();

        // The client expects identity fields at the top level, not nested
        // under a "profile" key.
        let json = response.json::<Value>();
        assert_eq!(json["id"], user.id().as_i64());
        assert_eq!(json["name"], "Nick Demo");
        assert_eq!(json["email"], "nick@example.com");
        assert!(json["joinDate"].is_string());
        assert_eq!(json["stats"]["savingsRate"], "0%");
    }

    #[tokio::test]
    async fn update_profile_changes_fields() {
        let (server, user, token) = get_test_server_and_user(get_test_app_config());

        let response = server
            .put("/profile")
            .authorization_bearer(token.clone())
            .content_type("application/json")
            .json(&json!({
                "name": "Nicholas Demo",
                "email": "nicholas@example.com",
                "profileImage": "https://example.com/avatar.png",
            }))
            .await;

        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["id"], user.id().as_i64());
        assert_eq!(json["name"], "Nicholas Demo");
        assert_eq!(json["email"], "nicholas@example.com");
        assert_eq!(json["profileImage"], "https://example.com/avatar.png");

        // The update is visible on the next profile fetch.
        let response = server.get("/profile").authorization_bearer(token).await;
        assert_eq!(response.json::<Value>()["name"], "Nicholas Demo");
    }

    #[tokio::test]
    async fn update_profile_rejects_invalid_email() {
        let (server, _user, token) = get_test_server_and_user(get_test_app_config());

        server
            .put("/profile")
            .authorization_bearer(token)
            .content_type("application/json")
            .json(&json!({
                "name": "Nick Demo",
                "email": "not-an-email",
                "profileImage": null,
            }))
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn get_chart_data_buckets_transactions() {
        let app_config = get_test_app_config();
        let (server, user, token) = get_test_server_and_user(app_config.clone());

        // 2024-03-15 is a Friday on day 15 of the month.
        insert_transaction(
            &app_config,
            &user,
            5_000_000.0,
            TransactionType::Income,
            "2024-03-15",
        );
        insert_transaction(
            &app_config,
            &user,
            1_500_000.0,
            TransactionType::Expense,
            "2024-03-16",
        );

        let response = server
            .get("/profile/chart-data")
            .authorization_bearer(token)
            .await;

        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["all"]["income"][2], 5_000_000.0);
        assert_eq!(json["all"]["expenses"][2], 1_500_000.0);
        assert_eq!(json["monthly"]["income"][2], 5_000_000.0);
        assert_eq!(json["weekly"]["income"][4], 5_000_000.0);
        assert_eq!(json["weekly"]["expenses"][5], 1_500_000.0);
        assert_eq!(json["all"]["labels"].as_array().unwrap().len(), 12);
        assert_eq!(json["monthly"]["labels"].as_array().unwrap().len(), 4);
        assert_eq!(json["weekly"]["labels"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn get_chart_data_with_no_transactions_returns_zero_buckets() {
        let (server, _user, token) = get_test_server_and_user(get_test_app_config());

        let response = server
            .get("/profile/chart-data")
            .authorization_bearer(token)
            .await;

        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["all"]["labels"][0], "Jan");
        assert!(json["all"]["income"]
            .as_array()
            .unwrap()
            .iter()
            .all(|value| value == 0.0));
    }
}
