use std::collections::HashMap;

use axum::{extract::Query, routing::get, Json, Router};

use crate::net::http_serde::paths;

/// Health/debug endpoint: echoes the query parameters back.
async fn handler(Query(params): Query<HashMap<String, String>>) -> Json<HashMap<String, String>> {
    Json(params)
}

pub fn router() -> Router {
    Router::new().route(paths::ECHO, get(handler))
}
