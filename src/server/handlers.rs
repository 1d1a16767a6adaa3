use axum::{
    extract::{RawQuery, State},
    response::Html,
    Json,
};
use serde::Serialize;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use super::response::{JsonBytes, PlainText};
use crate::dispatch::{queries_param, Dispatcher, QueryMode, Rows};
use crate::error::BenchResult;
use crate::fortune;
use crate::payload::{self, Payload};
use crate::store::World;

pub const HELLO_WORLD: &str = "Hello, World!";

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub startup_time: Instant,
    pub request_counter: Arc<AtomicU64>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

// ==================== Serialization ====================

pub async fn json_handler() -> Json<Message> {
    Json(Message {
        message: HELLO_WORLD,
    })
}

pub async fn plaintext_handler() -> PlainText {
    PlainText(HELLO_WORLD)
}

pub async fn json1k_handler() -> BenchResult<JsonBytes> {
    payload::respond(Payload::Json1k).map(JsonBytes)
}

pub async fn json10k_handler() -> BenchResult<JsonBytes> {
    payload::respond(Payload::Json10k).map(JsonBytes)
}

// ==================== Database ====================

pub async fn db_handler(State(state): State<AppState>) -> BenchResult<Json<World>> {
    Ok(Json(state.dispatcher.single().await?))
}

pub async fn queries_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> BenchResult<Json<Rows>> {
    let count = queries_param(query.as_deref());
    let rows = state
        .dispatcher
        .dispatch(count.as_deref(), QueryMode::ReadOnly)
        .await?;
    Ok(Json(rows))
}

pub async fn update_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> BenchResult<Json<Rows>> {
    let count = queries_param(query.as_deref());
    let rows = state
        .dispatcher
        .dispatch(count.as_deref(), QueryMode::ReadAndUpdate)
        .await?;
    Ok(Json(rows))
}

pub async fn fortune_handler(State(state): State<AppState>) -> BenchResult<Html<String>> {
    let page = fortune::fortunes_page(state.dispatcher.store()).await?;
    Ok(Html(page))
}
