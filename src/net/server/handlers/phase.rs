//! Handlers for the upstream-pipeline phases: element upload (phase 0) and
//! hash array construction (phase 1).

use std::sync::Arc;

use axum::{
    extract::Query,
    routing::{get, post},
    Extension, Json, Router,
};
use bytes::Bytes;

use crate::{
    error::Error,
    net::http_serde::{
        paths, FinalizeElementsResponse, FinalizeHashesResponse, InitializeElementsRequest,
        InitializeHashesRequest, ReadElementQuery, ReadElementResponse, StoreHashRequest,
        UploadElementsRequest,
    },
    store::StoreHandle,
};

async fn initialize_elements(
    Extension(store): Extension<Arc<StoreHandle>>,
    Json(body): Json<InitializeElementsRequest>,
) -> Result<(), Error> {
    store.initialize_elements(body.total)
}

async fn upload_elements(
    Extension(store): Extension<Arc<StoreHandle>>,
    Json(body): Json<UploadElementsRequest>,
) -> Result<(), Error> {
    let cells = body.cells.into_iter().map(Bytes::from).collect();
    store.upload_elements(body.start, cells)
}

async fn finalize_elements(
    Extension(store): Extension<Arc<StoreHandle>>,
) -> Result<Json<FinalizeElementsResponse>, Error> {
    let stored = store.finalize_elements()?;
    Ok(Json(FinalizeElementsResponse { stored }))
}

async fn read_element(
    Extension(store): Extension<Arc<StoreHandle>>,
    Query(query): Query<ReadElementQuery>,
) -> Result<Json<ReadElementResponse>, Error> {
    let cell = store.read_element(query.position)?;
    Ok(Json(ReadElementResponse { cell: cell.into() }))
}

async fn initialize_hashes(
    Extension(store): Extension<Arc<StoreHandle>>,
    Json(body): Json<InitializeHashesRequest>,
) -> Result<(), Error> {
    store.initialize_hashes(body.expected)
}

async fn store_hash(
    Extension(store): Extension<Arc<StoreHandle>>,
    Json(body): Json<StoreHashRequest>,
) -> Result<(), Error> {
    store.store_hash(body.index, body.cell.into())
}

async fn finalize_hashes(
    Extension(store): Extension<Arc<StoreHandle>>,
) -> Result<Json<FinalizeHashesResponse>, Error> {
    let (received, expected) = store.finalize_hashes()?;
    Ok(Json(FinalizeHashesResponse { received, expected }))
}

pub fn router() -> Router {
    Router::new()
        .route(paths::ELEMENTS, post(initialize_elements))
        .route(paths::ELEMENTS_BATCH, post(upload_elements))
        .route(paths::ELEMENTS_FINALIZE, post(finalize_elements))
        .route(paths::ELEMENTS_CELL, get(read_element))
        .route(paths::HASHES, post(initialize_hashes))
        .route(paths::HASHES_VALUE, post(store_hash))
        .route(paths::HASHES_FINALIZE, post(finalize_hashes))
}
