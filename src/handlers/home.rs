use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{NewUser, User};
use crate::error::ApiError;
use crate::middleware::{ParamRules, ParamSchema, Rule, Verified};

use super::users;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl ParamSchema for LoginRequest {
    fn rules() -> ParamRules {
        ParamRules::new()
            .field("username", Rule::string().required())
            .field("password", Rule::string().required())
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
}

/// GET / - Service description
pub async fn index() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Arbitrage API",
        "version": version,
        "endpoints": {
            "home": "GET / (public)",
            "login": "POST /login (public - token acquisition)",
            "register": "POST /register (public)",
            "users": "GET, POST /users (public)",
            "user": "GET /users/:id (public), PUT, DELETE /users/:id (bearer token, owner only)",
        }
    }))
}

/// POST /login - Exchange username and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Verified(credentials): Verified<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .users
        .find_by_username(&credentials.username)
        .await?
        .filter(|user| user.password == credentials.password)
        .ok_or_else(|| {
            tracing::debug!("Failed login for {}", credentials.username);
            ApiError::unauthorized("invalid username or password")
        })?;

    let token = state.jwt.issue_for(&user).map_err(|e| {
        tracing::error!("Token generation failed: {}", e);
        ApiError::internal_server_error("Failed to issue token")
    })?;

    tracing::info!("User {} logged in", user.id);
    Ok(Json(LoginResponse {
        token,
        user: SessionUser {
            id: user.id,
            username: user.username,
        },
    }))
}

/// POST /register - Same contract as POST /users
pub async fn register(
    state: State<AppState>,
    new_user: Verified<NewUser>,
) -> Result<Json<User>, ApiError> {
    users::create(state, new_user).await
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::testing::TestApp;

    #[tokio::test]
    async fn index_describes_service() {
        let app = TestApp::new();
        let (status, body) = app.get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Arbitrage API");
        assert!(body["endpoints"].is_object());
    }

    #[tokio::test]
    async fn register_creates_a_user() {
        let app = TestApp::new();
        let (status, body) = app
            .post("/register", json!({"username": "johan", "password": "123"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "johan");

        let (_, list) = app.get("/users").await;
        assert_eq!(list.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn register_validates_like_create() {
        let app = TestApp::new();
        let (status, body) = app.post("/register", json!({"username": "johan"})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field_errors"]["password"], "required");
    }

    #[tokio::test]
    async fn login_issues_token_usable_for_updates() {
        let app = TestApp::new();
        let created = app.create_user("johan", "123").await;
        let id = created["_id"].as_str().unwrap();

        let (status, body) = app
            .post("/login", json!({"username": "johan", "password": "123"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["_id"], id);
        assert!(body["user"].get("password").is_none());

        let token = body["token"].as_str().unwrap();
        let (status, _) = app
            .put(&format!("/users/{}", id), json!({"password": "456"}), Some(token))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let app = TestApp::new();
        app.create_user("johan", "123").await;

        let (status, body) = app
            .post("/login", json!({"username": "johan", "password": "nope"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "invalid username or password");

        let (status, _) = app
            .post("/login", json!({"username": "nobody", "password": "123"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
