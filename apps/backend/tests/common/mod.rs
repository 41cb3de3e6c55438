//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - TestContext over the in-memory store, or PostgreSQL for ignored tests
//! - Helper functions for creating test data
//! - Authentication helpers
//!
//! # Requirements
//! Tests marked `#[ignore = "requires database"]` need DATABASE_URL.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use axum_test::TestServer;
use serde_json::json;

use invin_backend::config::Config;
use invin_backend::db::{MemoryStore, PgStore, Store};
use invin_backend::models::{Category, Playable};
use invin_backend::AppState;

/// Test context holding the store and the router built over it.
pub struct TestContext {
    pub store: Arc<dyn Store>,
    /// Set when the context runs on the in-memory store.
    pub memory: Option<Arc<MemoryStore>>,
    app: Router,
}

impl TestContext {
    /// Context on a fresh in-memory store with dev mode and an admin token.
    pub fn new() -> Self {
        Self::with_config(fixtures::test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn Store> = memory.clone();
        let app = invin_backend::router(AppState::new(store.clone(), config));
        Self {
            store,
            memory: Some(memory),
            app,
        }
    }

    /// Context on PostgreSQL.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn postgres(config: Config) -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let store = PgStore::connect(&database_url, 5)
            .await
            .expect("Failed to connect to test database");

        store
            .run_migrations()
            .await
            .expect("Failed to run migrations");

        let store: Arc<dyn Store> = Arc::new(store);
        let app = invin_backend::router(AppState::new(store.clone(), config));
        Self {
            store,
            memory: None,
            app,
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).unwrap()
    }

    /// Switch the in-memory store on or off.
    pub fn set_offline(&self, offline: bool) {
        if let Some(memory) = &self.memory {
            memory.set_offline(offline);
        }
    }

    /// Insert playables directly, creating their categories as needed.
    pub async fn add_playables(&self, playables: &[Playable]) {
        for playable in playables {
            if self
                .store
                .get_category(&playable.category)
                .await
                .unwrap()
                .is_none()
            {
                self.store
                    .insert_category(&Category {
                        name: playable.category.clone(),
                        icon: None,
                        color: None,
                        playable_count: 0,
                    })
                    .await
                    .unwrap();
            }
            self.store.insert_playable(playable).await.unwrap();
        }
    }

    /// Log in through the dev login endpoint and return the session token.
    pub async fn login(server: &TestServer, email: &str) -> String {
        let response = server
            .post("/api/auth/dev-login")
            .json(&json!({ "email": email, "name": "Test User" }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["session_token"].as_str().unwrap().to_string()
    }

    /// Format authorization header value.
    pub fn auth_header_value(token: &str) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
    }
}
