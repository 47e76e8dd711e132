use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::app::{router, AppState};
use crate::auth::Claims;
use crate::config::AppConfig;
use crate::database::MemoryUserRepository;

pub const TEST_SECRET: &str = "test-secret";

/// In-process app over a fresh memory repository
pub struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let mut config = AppConfig::from_lookup(|_| None);
        config.security.jwt_secret = TEST_SECRET.to_string();
        config.server.static_dir = "target/no-static-files".to_string();

        let state = AppState::new(config, Arc::new(MemoryUserRepository::new()))
            .expect("test secret is set");

        Self {
            router: router(state.clone()),
            state,
        }
    }

    /// Bearer token for an arbitrary user id
    pub fn token_for(&self, id: &str) -> String {
        let claims = Claims::new(id, None, 1);
        self.state.jwt.generate(&claims).expect("token")
    }

    pub async fn create_user(&self, username: &str, password: &str) -> Value {
        let (status, body) = self
            .post(
                "/users",
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {}", body);
        body
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body), None).await
    }

    pub async fn put(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(body), token).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("DELETE", uri, None, token).await
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        match body {
            Some(body) => self.send_raw(method, uri, &body.to_string(), token).await,
            None => self.request(method, uri, Body::empty(), None, token).await,
        }
    }

    /// Sends `body` verbatim as `application/json`
    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        body: &str,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        self.send_as(method, uri, body, Some("application/json"), token)
            .await
    }

    /// Sends `body` verbatim under an arbitrary (or no) content type
    pub async fn send_as(
        &self,
        method: &str,
        uri: &str,
        body: &str,
        content_type: Option<&str>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        self.request(method, uri, Body::from(body.to_string()), content_type, token)
            .await
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Body,
        content_type: Option<&str>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, value)
    }
}
