// Holocron - Web Server
// Thin REST layer over holocron::Backend

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use holocron::{
    logging, Backend, Config, ErrorKind, NewCharacter, NewPlanet, NewUser, Store, StoreError,
    TargetKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Parser)]
#[command(name = "holocron-server")]
struct Args {
    #[command(flatten)]
    config: Config,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    backend: Backend,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            msg: None,
            data,
        }
    }

    fn with_msg(msg: &str, data: T) -> Self {
        Self {
            success: true,
            msg: Some(msg.to_string()),
            data,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    msg: String,
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<String>,
}

/// StoreError rendered as a stable kind plus message
struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = match kind {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let msg = match kind {
            ErrorKind::StorageFailure => "Storage failure".to_string(),
            _ => self.0.to_string(),
        };
        let body = ErrorBody {
            success: false,
            msg,
            error: kind.as_str(),
            cause: self.0.cause(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize)]
struct UserQuery {
    user_id: Option<i64>,
}

/// Unwrap a JSON body, reporting rejections in the API error shape
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError(StoreError::validation(format!("invalid JSON body: {}", e.body_text()))))
}

/// Caller identity for favorite mutations.
///
/// Only an absent or empty body, or a missing/null `user_id`, falls back to
/// the default user. A `user_id` given as a number or numeric string is used
/// as is; anything else is rejected.
fn user_id_from_body(body: &[u8]) -> Result<Option<i64>, StoreError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| StoreError::validation(format!("invalid JSON body: {}", e)))?;
    let fields = value
        .as_object()
        .ok_or_else(|| StoreError::validation("JSON body must be an object"))?;

    let invalid = || StoreError::validation("user_id must be an integer");
    match fields.get("user_id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

async fn list_people(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(state.backend.list_characters()?)))
}

async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(state.backend.get_character(id)?)))
}

async fn list_planets(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(state.backend.list_planets()?)))
}

async fn get_planet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(state.backend.get_planet(id)?)))
}

async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(state.backend.list_users()?)))
}

/// GET /users/favorites?user_id= - defaults to user 1
async fn list_favorites(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(ApiResponse::ok(
        state.backend.list_user_favorites(query.user_id)?,
    )))
}

async fn add_favorite(
    state: &AppState,
    kind: TargetKind,
    id: i64,
    body: Bytes,
) -> ApiResult<Response> {
    let user_id = user_id_from_body(&body)?;
    let favorite = state.backend.add_favorite(kind, id, user_id)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_msg("Favorite added", favorite)),
    )
        .into_response())
}

async fn remove_favorite(
    state: &AppState,
    kind: TargetKind,
    id: i64,
    body: Bytes,
) -> ApiResult<Response> {
    let user_id = user_id_from_body(&body)?;
    state.backend.remove_favorite(kind, id, user_id)?;
    Ok(Json(ApiResponse::with_msg("Favorite removed", ())).into_response())
}

async fn add_favorite_planet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Response> {
    add_favorite(&state, TargetKind::Planet, id, body).await
}

async fn remove_favorite_planet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Response> {
    remove_favorite(&state, TargetKind::Planet, id, body).await
}

async fn add_favorite_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Response> {
    add_favorite(&state, TargetKind::Character, id, body).await
}

async fn remove_favorite_person(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Response> {
    remove_favorite(&state, TargetKind::Character, id, body).await
}

async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let new = json_body(payload)?;
    let user = state.backend.create_user(&new)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_msg("User created", user)),
    ))
}

async fn create_person(
    State(state): State<AppState>,
    payload: Result<Json<NewCharacter>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let new = json_body(payload)?;
    let person = state.backend.create_character(&new)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_msg("Character created", person)),
    ))
}

async fn create_planet(
    State(state): State<AppState>,
    payload: Result<Json<NewPlanet>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let new = json_body(payload)?;
    let planet = state.backend.create_planet(&new)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_msg("Planet created", planet)),
    ))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/people", get(list_people).post(create_person))
        .route("/people/:id", get(get_person))
        .route("/planets", get(list_planets))
        .route("/planets/:id", get(get_planet))
        .route("/planet", post(create_planet))
        .route("/users", get(list_users))
        .route("/users/favorites", get(list_favorites))
        .route("/user", post(create_user))
        .route(
            "/favorite/planet/:id",
            post(add_favorite_planet).delete(remove_favorite_planet),
        )
        .route(
            "/favorite/people/:id",
            post(add_favorite_person).delete(remove_favorite_person),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logger(args.config.verbose, args.config.json_logs);

    let store = Store::from_url(&args.config.database_url)?;
    let state = AppState {
        backend: Backend::new(store),
    };

    let addr = args.config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "server running");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    /// Users 1-2 and planet 1
    fn app() -> (Router, Backend) {
        let backend = Backend::new(Store::open_in_memory().unwrap());
        backend.create_user(&NewUser::new("luke@rebels.org", "pw")).unwrap();
        backend.create_user(&NewUser::new("leia@rebels.org", "pw")).unwrap();
        backend.create_planet(&NewPlanet::named("Tatooine")).unwrap();
        let router = router(AppState {
            backend: backend.clone(),
        });
        (router, backend)
    }

    async fn send(router: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    fn favorites_of(backend: &Backend, user_id: i64) -> usize {
        backend.list_user_favorites(Some(user_id)).unwrap().len()
    }

    #[test]
    fn test_user_id_from_body() {
        assert_eq!(user_id_from_body(b"").unwrap(), None);
        assert_eq!(user_id_from_body(b"  \n").unwrap(), None);
        assert_eq!(user_id_from_body(b"{}").unwrap(), None);
        assert_eq!(user_id_from_body(br#"{"user_id": null}"#).unwrap(), None);
        assert_eq!(user_id_from_body(br#"{"user_id": 2}"#).unwrap(), Some(2));
        assert_eq!(user_id_from_body(br#"{"user_id": "2"}"#).unwrap(), Some(2));

        let bad: [&[u8]; 5] = [
            br#"{"user_id": "two"}"#,
            br#"{"user_id": 2.5}"#,
            br#"{"user_id": true}"#,
            b"[1]",
            b"{user_id",
        ];
        for bad in bad {
            let err = user_id_from_body(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_numeric_string_user_id_targets_that_user() {
        let (router, backend) = app();

        let (status, body) = send(router, "POST", "/favorite/planet/1", r#"{"user_id": "2"}"#).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["user_id"], 2);
        assert_eq!(favorites_of(&backend, 1), 0);
        assert_eq!(favorites_of(&backend, 2), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected_without_touching_default_user() {
        let (router, backend) = app();

        let (status, body) = send(router, "POST", "/favorite/planet/1", r#"{"user_id": 2"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert_eq!(favorites_of(&backend, 1), 0);
        assert_eq!(favorites_of(&backend, 2), 0);
    }

    #[tokio::test]
    async fn test_empty_body_uses_default_user() {
        let (router, backend) = app();

        let (status, _) = send(router.clone(), "POST", "/favorite/planet/1", "").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(favorites_of(&backend, 1), 1);

        let (status, _) = send(router, "DELETE", "/favorite/planet/1", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(favorites_of(&backend, 1), 0);
    }

    #[tokio::test]
    async fn test_remove_with_invalid_user_id_is_rejected() {
        let (router, backend) = app();
        backend.add_favorite(TargetKind::Planet, 1, Some(1)).unwrap();

        let (status, _) = send(router, "DELETE", "/favorite/planet/1", r#"{"user_id": [1]}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(favorites_of(&backend, 1), 1);
    }

    #[tokio::test]
    async fn test_create_with_invalid_json_uses_error_shape() {
        let (router, backend) = app();

        for (uri, body) in [
            ("/user", "not json"),
            ("/people", r#"{"name": "Luke""#),
            ("/planet", ""),
        ] {
            let (status, json) = send(router.clone(), "POST", uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(json["success"], false);
            assert_eq!(json["error"], "validation_error");
            assert!(json["msg"].as_str().unwrap().starts_with("Validation error"));
        }

        assert_eq!(backend.list_users().unwrap().len(), 2);
        assert!(backend.list_characters().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_missing_field_is_validation_error() {
        let (router, _backend) = app();

        let (status, json) = send(router, "POST", "/user", r#"{"email": "han@falcon.com"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "validation_error");
    }
}
