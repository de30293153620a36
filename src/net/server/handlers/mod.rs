mod echo;
mod phase;
mod sort;

use std::sync::Arc;

use axum::{Extension, Router};

use crate::store::StoreHandle;

pub fn router(store: Arc<StoreHandle>) -> Router {
    echo::router()
        .merge(phase::router())
        .merge(sort::router())
        .layer(Extension(store))
}
