//! Handlers for the sort session: array initialization, the oblivious pair
//! operations, matchings, and the final drain.

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
        paths, ArraySizeResponse, FinalArrayResponse, GetMateQuery, GetMateResponse, GetPairQuery,
        GetPairResponse, InitializeRequest, WritePairRequest,
    },
    store::StoreHandle,
};

async fn initialize(
    Extension(store): Extension<Arc<StoreHandle>>,
    Json(body): Json<InitializeRequest>,
) -> Result<Json<ArraySizeResponse>, Error> {
    let cells = body.cells.into_iter().map(Bytes::from).collect();
    let array_size = store.initialize(cells)?;
    Ok(Json(ArraySizeResponse { array_size }))
}

async fn use_hash_array(
    Extension(store): Extension<Arc<StoreHandle>>,
) -> Result<Json<ArraySizeResponse>, Error> {
    let array_size = store.use_hash_array_for_sorting()?;
    Ok(Json(ArraySizeResponse { array_size }))
}

async fn get_pair(
    Extension(store): Extension<Arc<StoreHandle>>,
    Query(query): Query<GetPairQuery>,
) -> Result<Json<GetPairResponse>, Error> {
    let (cell_a, cell_b) = store.get_pair(query.a, query.b)?;
    Ok(Json(GetPairResponse {
        cell_a: cell_a.into(),
        cell_b: cell_b.into(),
    }))
}

async fn write_pair(
    Extension(store): Extension<Arc<StoreHandle>>,
    Json(body): Json<WritePairRequest>,
) -> Result<(), Error> {
    store.write_pair(body.a, body.b, body.cell_a.into(), body.cell_b.into())
}

async fn get_mate(
    Extension(store): Extension<Arc<StoreHandle>>,
    Query(query): Query<GetMateQuery>,
) -> Result<Json<GetMateResponse>, Error> {
    let mate = store.get_mate(query.size, query.seed, query.index)?;
    Ok(Json(GetMateResponse { mate }))
}

async fn final_array(
    Extension(store): Extension<Arc<StoreHandle>>,
) -> Json<FinalArrayResponse> {
    let snapshot = store.final_array();
    Json(FinalArrayResponse {
        cells: snapshot.cells.into_iter().map(Into::into).collect(),
        comparisons: snapshot.comparisons,
        writes: snapshot.writes,
    })
}

pub fn router() -> Router {
    Router::new()
        .route(paths::SORT, post(initialize))
        .route(paths::SORT_FROM_HASHES, post(use_hash_array))
        .route(paths::SORT_PAIR, get(get_pair).post(write_pair))
        .route(paths::SORT_MATE, get(get_mate))
        .route(paths::SORT_FINAL, get(final_array))
}
