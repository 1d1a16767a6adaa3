//! Common test utilities for the HTTP tests
//!
//! Provides shared helpers for:
//! - Seeding a throwaway database
//! - Building the router over it
//! - Reading response bodies

#![allow(dead_code)]

use axum::body::Body;
use axum::http::Request;
use serde_json::Value;
use std::time::Duration;
use tempfile::TempDir;
use worldbench::store::seed;
use worldbench::{create_router, RowStore, ServerConfig};

pub const TEST_DOMAIN: i32 = 100;

pub fn test_config(tmp: &TempDir, pool_size: usize) -> ServerConfig {
    ServerConfig {
        database: tmp.path().join("hello_world.db"),
        pool_size,
        row_domain_size: TEST_DOMAIN,
        max_queries: 500,
        acquire_timeout: Duration::from_secs(5),
        query_timeout: Duration::from_secs(5),
        ..ServerConfig::default()
    }
}

pub fn create_seeded_store(pool_size: usize) -> (RowStore, ServerConfig, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let config = test_config(&tmp, pool_size);
    seed::seed_database(&config.database, config.row_domain_size)
        .expect("Failed to seed database");
    let store = RowStore::open(&config).expect("Failed to open row store");
    (store, config, tmp)
}

pub fn create_test_app() -> (axum::Router, RowStore, TempDir) {
    let (store, config, tmp) = create_seeded_store(8);
    let router = create_router(store.clone(), &config);
    (router, store, tmp)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn response_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 4 * 1024 * 1024)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4 * 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Assert `value` is a `{id, randomNumber}` object inside the test domain.
pub fn assert_world(value: &Value) {
    let object = value.as_object().expect("expected a World object");
    assert_eq!(object.len(), 2, "unexpected fields in {}", value);
    let id = object["id"].as_i64().expect("id must be an integer");
    let random_number = object["randomNumber"]
        .as_i64()
        .expect("randomNumber must be an integer");
    assert!((1..=TEST_DOMAIN as i64).contains(&id), "id {} out of range", id);
    assert!(
        (0..=TEST_DOMAIN as i64).contains(&random_number),
        "randomNumber {} out of range",
        random_number
    );
}
