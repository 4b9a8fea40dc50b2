//! Token-based authentication: issuing JWTs at sign-in and registration, and
//! validating them on every protected route via the [Claims] extractor.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRef, FromRequestParts, Json, State},
    http::request::Parts,
    http::{Response, StatusCode},
    response::IntoResponse,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use common::{Email, NewUser, PasswordError, PasswordHash, RawPassword, User, UserID};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    config::AppConfig,
    db::{DbError, Insert, SelectBy},
    AppError,
};

/// How long an issued token stays valid.
const TOKEN_LIFETIME_DAYS: i64 = 7;

/// The contents of a JSON Web Token.
#[derive(Serialize, Deserialize)]
pub struct Claims {
    /// The expiry time of the token.
    pub exp: usize,
    /// The time the token was issued.
    pub iat: usize,
    /// The ID of the user the token was issued to.
    pub sub: UserID,
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    AppConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::InvalidToken)?;

        let app_config = parts
            .extract_with_state::<AppConfig, _>(state)
            .await
            .map_err(|_| AuthError::InvalidToken)?;

        let token_data = decode_jwt(bearer.token(), app_config.decoding_key())?;

        Ok(token_data.claims)
    }
}

/// The payload of a sign-in request.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Username entered during sign-in.
    pub username: String,
    /// Password entered during sign-in.
    pub password: RawPassword,
}

/// The payload of a registration request.
#[derive(Debug, Deserialize)]
pub struct RegistrationData {
    pub username: String,
    pub password: RawPassword,
    pub name: String,
    pub email: Email,
}

/// The response to a successful sign-in or registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug)]
pub enum AuthError {
    WrongCredentials,
    TokenCreation,
    InvalidToken,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response<Body> {
        let (status, error_message) = match self {
            AuthError::WrongCredentials => (StatusCode::UNAUTHORIZED, "Wrong credentials"),
            AuthError::TokenCreation => (StatusCode::INTERNAL_SERVER_ERROR, "Token creation error"),
            AuthError::InvalidToken => (StatusCode::BAD_REQUEST, "Invalid token"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Handler for sign-in requests.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The username does not belong to a registered user.
/// - The password is not correct.
/// - An internal error occurred when verifying the password.
///
/// Unknown usernames and wrong passwords produce the same response so that
/// the endpoint cannot be used to probe for registered usernames.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn sign_in(
    State(state): State<AppConfig>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenResponse>, AuthError> {
    let user = User::select(
        credentials.username.as_str(),
        &state.db_connection().lock().unwrap(),
    )
    .map_err(|e| match e {
        DbError::NotFound => AuthError::WrongCredentials,
        _ => {
            tracing::error!("Error matching user: {e:?}");
            AuthError::InternalError
        }
    })?;

    let password_is_correct = user
        .password_hash()
        .verify(&credentials.password)
        .map_err(|e| {
            tracing::error!("Error verifying password: {e}");
            AuthError::InternalError
        })?;

    if password_is_correct {
        let token = encode_jwt(user.id(), state.encoding_key())?;

        Ok(Json(TokenResponse { token }))
    } else {
        Err(AuthError::WrongCredentials)
    }
}

/// Handler for registration requests.
///
/// Creates the user and signs them in, responding with a token just like
/// [sign_in].
///
/// # Errors
///
/// This function will return an error if:
/// - the password is too weak,
/// - the username or email is already registered,
/// - or there was an internal error while hashing the password or creating
///   the user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn register(
    State(state): State<AppConfig>,
    Json(registration): Json<RegistrationData>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let password_hash =
        PasswordHash::from_raw_password(&registration.password).map_err(|e| match e {
            PasswordError::TooWeak(_) | PasswordError::Empty => {
                AppError::Registration(e.to_string())
            }
            PasswordError::HashingError(_) => {
                tracing::error!("Error hashing password: {e}");
                AppError::InternalError
            }
        })?;

    let user = NewUser {
        username: registration.username,
        password_hash,
        name: registration.name,
        email: registration.email,
    }
    .insert(&state.db_connection().lock().unwrap())
    .map_err(|e| match e {
        DbError::DuplicateUsername | DbError::DuplicateEmail => {
            AppError::Registration("Username or email already registered".to_string())
        }
        e => e.into(),
    })?;

    let token = encode_jwt(user.id(), state.encoding_key())
        .map_err(|_| AppError::InternalError)?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

pub(crate) fn encode_jwt(
    user_id: UserID,
    encoding_key: &EncodingKey,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = (now + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp() as usize;
    let iat = now.timestamp() as usize;
    let claims = Claims {
        exp,
        iat,
        sub: user_id,
    };

    encode(&Header::default(), &claims, encoding_key).map_err(|e| {
        tracing::error!("Error encoding JWT: {e}");
        AuthError::TokenCreation
    })
}

fn decode_jwt(jwt_token: &str, decoding_key: &DecodingKey) -> Result<TokenData<Claims>, AuthError> {
    decode(jwt_token, decoding_key, &Validation::default()).map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use axum_test::TestServer;
    use common::{Email, NewUser, PasswordHash, RawPassword, User, UserID};
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        auth::{self, Claims, TokenResponse},
        config::AppConfig,
        db::{initialize, Insert},
    };

    fn get_test_app_config() -> AppConfig {
        let db_connection =
            Connection::open_in_memory().expect("Could not open database in memory.");
        initialize(&db_connection).expect("Could not initialize database.");

        AppConfig::new(db_connection, "foobar".to_string())
    }

    fn insert_test_user(app_config: &AppConfig, raw_password: &RawPassword) -> User {
        NewUser {
            username: "foo".to_string(),
            password_hash: PasswordHash::new(raw_password).unwrap(),
            name: "Foo Bar".to_string(),
            email: Email::new("foo@bar.baz").unwrap(),
        }
        .insert(&app_config.db_connection().lock().unwrap())
        .unwrap()
    }

    #[test]
    fn decode_jwt_gives_correct_user_id() {
        let config = get_test_app_config();
        let user_id = UserID::new(42);

        let jwt = auth::encode_jwt(user_id, config.encoding_key()).unwrap();
        let claims = auth::decode_jwt(&jwt, config.decoding_key()).unwrap().claims;

        assert_eq!(user_id, claims.sub);
    }

    #[test]
    fn decode_jwt_fails_with_wrong_secret() {
        let config = get_test_app_config();
        let other_config = AppConfig::new(Connection::open_in_memory().unwrap(), "42".to_string());

        let jwt = auth::encode_jwt(UserID::new(1), config.encoding_key()).unwrap();

        assert!(auth::decode_jwt(&jwt, other_config.decoding_key()).is_err());
    }

    #[tokio::test]
    async fn sign_in_succeeds_with_valid_credentials() {
        let app_config = get_test_app_config();
        let raw_password = RawPassword::new("averysafeandsecurepassword".to_string()).unwrap();
        insert_test_user(&app_config, &raw_password);

        let app = Router::new()
            .route("/auth/login", post(auth::sign_in))
            .with_state(app_config);

        let server = TestServer::new(app).expect("Could not create test server.");

        let response = server
            .post("/auth/login")
            .content_type("application/json")
            .json(&json!({
                "username": "foo",
                "password": "averysafeandsecurepassword",
            }))
            .await;

        response.assert_status_ok();
        assert!(!response.json::<TokenResponse>().token.is_empty());
    }

    #[tokio::test]
    async fn sign_in_fails_with_unknown_username() {
        let app = Router::new()
            .route("/auth/login", post(auth::sign_in))
            .with_state(get_test_app_config());

        let server = TestServer::new(app).expect("Could not create test server.");

        server
            .post("/auth/login")
            .content_type("application/json")
            .json(&json!({
                "username": "nobody",
                "password": "definitelyNotTheCorrectPassword",
            }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sign_in_fails_with_wrong_password() {
        let app_config = get_test_app_config();
        let raw_password = RawPassword::new("averysafeandsecurepassword".to_string()).unwrap();
        insert_test_user(&app_config, &raw_password);

        let app = Router::new()
            .route("/auth/login", post(auth::sign_in))
            .with_state(app_config);

        let server = TestServer::new(app).expect("Could not create test server.");

        server
            .post("/auth/login")
            .content_type("application/json")
            .json(&json!({
                "username": "foo",
                "password": "definitelyNotTheCorrectPassword",
            }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_creates_user_and_returns_token() {
        let app = Router::new()
            .route("/auth/register", post(auth::register))
            .with_state(get_test_app_config());

        let server = TestServer::new(app).expect("Could not create test server.");

        let response = server
            .post("/auth/register")
            .content_type("application/json")
            .json(&json!({
                "username": "foo",
                "password": "averysafeandsecurepassword",
                "name": "Foo Bar",
                "email": "foo@bar.baz",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        assert!(!response.json::<TokenResponse>().token.is_empty());
    }

    #[tokio::test]
    async fn register_fails_with_weak_password() {
        let app = Router::new()
            .route("/auth/register", post(auth::register))
            .with_state(get_test_app_config());

        let server = TestServer::new(app).expect("Could not create test server.");

        server
            .post("/auth/register")
            .content_type("application/json")
            .json(&json!({
                "username": "foo",
                "password": "hunter2",
                "name": "Foo Bar",
                "email": "foo@bar.baz",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_fails_with_taken_username() {
        let app_config = get_test_app_config();
        let raw_password = RawPassword::new("averysafeandsecurepassword".to_string()).unwrap();
        insert_test_user(&app_config, &raw_password);

        let app = Router::new()
            .route("/auth/register", post(auth::register))
            .with_state(app_config);

        let server = TestServer::new(app).expect("Could not create test server.");

        server
            .post("/auth/register")
            .content_type("application/json")
            .json(&json!({
                "username": "foo",
                "password": "anotherverysecurepassword",
                "name": "Foo Two",
                "email": "foo2@bar.baz",
            }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    async fn handler_with_auth(claims: Claims) -> Json<UserID> {
        Json(claims.sub)
    }

    #[tokio::test]
    async fn get_protected_route_with_valid_jwt() {
        let app_config = get_test_app_config();
        let raw_password = RawPassword::new("averysafeandsecurepassword".to_string()).unwrap();
        let test_user = insert_test_user(&app_config, &raw_password);

        let app = Router::new()
            .route("/auth/login", post(auth::sign_in))
            .route("/protected", get(handler_with_auth))
            .with_state(app_config);

        let server = TestServer::new(app).expect("Could not create test server.");

        let response = server
            .post("/auth/login")
            .content_type("application/json")
            .json(&json!({
                "username": "foo",
                "password": "averysafeandsecurepassword",
            }))
            .await;

        response.assert_status_ok();

        let token = response.json::<TokenResponse>().token;

        let protected_response = server
            .get("/protected")
            .authorization_bearer(token)
            .await;

        protected_response.assert_status_ok();
        assert_eq!(protected_response.json::<UserID>(), test_user.id());
    }

    #[tokio::test]
    async fn get_protected_route_with_missing_header() {
        let app = Router::new()
            .route("/protected", get(handler_with_auth))
            .with_state(get_test_app_config());

        let server = TestServer::new(app).expect("Could not create test server.");

        server
            .get("/protected")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_protected_route_with_invalid_token() {
        let app = Router::new()
            .route("/protected", get(handler_with_auth))
            .with_state(get_test_app_config());

        let server = TestServer::new(app).expect("Could not create test server.");

        server
            .get("/protected")
            .authorization_bearer("notavalidjwt")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
