/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - An in-memory store with an admin and two members
/// - JWT token generation
/// - A request helper that drives the router directly

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::jwt::{create_token, Claims};
use taskboard_shared::auth::password::hash_password;
use taskboard_shared::models::user::{CreateUser, Role, User};
use taskboard_shared::store::memory::MemoryStore;
use taskboard_shared::store::Store;
use tower::Service as _;

pub const TEST_PASSWORD: &str = "password123";
pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub config: Config,
    pub admin: User,
    pub alice: User,
    pub bob: User,
}

impl TestContext {
    /// Creates a new test context with a fresh store
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_vars(|key| match key {
            "STORE_BACKEND" => Some("memory".to_string()),
            "JWT_SECRET" => Some(TEST_SECRET.to_string()),
            _ => None,
        })?;

        let store = Arc::new(MemoryStore::new());

        // One hash shared by every account; Argon2 is slow at production cost
        let password_hash = hash_password(TEST_PASSWORD)?;

        let admin = create_user(&store, "Admin User", "admin@example.com", Role::Admin, &password_hash).await?;
        let alice = create_user(&store, "Alice", "alice@example.com", Role::Member, &password_hash).await?;
        let bob = create_user(&store, "Bob", "bob@example.com", Role::Member, &password_hash).await?;

        let app = build_router(AppState::new(store.clone(), config.clone()));

        Ok(TestContext {
            store,
            app,
            config,
            admin,
            alice,
            bob,
        })
    }

    /// Issues a valid bearer token for `user`
    pub fn token_for(&self, user: &User) -> String {
        let claims = Claims::new(user.id, self.config.jwt.expires_in());
        create_token(&claims, &self.config.jwt.secret).unwrap()
    }

    /// Sends a request and returns the status with the parsed JSON body
    ///
    /// Empty bodies come back as `Value::Null`.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<&User>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let token = user.map(|u| self.token_for(u));
        self.send_raw(method, uri, token.as_deref(), body.map(|b| b.to_string()))
            .await
    }

    /// Sends a request with an explicit token and raw body
    pub async fn send_raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("Non-JSON response body: {}", String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    /// Creates a task as `user` through the API and returns its id
    pub async fn create_task(&self, user: &User, body: Value) -> String {
        let (status, json) = self.send("POST", "/api/tasks", Some(user), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", json);
        json["id"].as_str().unwrap().to_string()
    }
}

async fn create_user(
    store: &MemoryStore,
    name: &str,
    email: &str,
    role: Role,
    password_hash: &str,
) -> anyhow::Result<User> {
    let user = store
        .create_user(CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
        })
        .await?;
    Ok(user)
}

/// Ids of the tasks in a list response
pub fn task_ids(list: &Value) -> Vec<String> {
    list["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["id"].as_str().unwrap().to_string())
        .collect()
}
