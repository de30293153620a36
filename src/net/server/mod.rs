mod handlers;

use std::{net::TcpListener, sync::Arc};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use tracing::info;

use crate::{error::Error, store::StoreHandle};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::FailedPrecondition(_) => StatusCode::PRECONDITION_FAILED,
            Error::OutOfRange(_) => StatusCode::RANGE_NOT_SATISFIABLE,
            // Integrity and transport failures are client-side conditions;
            // a store reaching here is a bug.
            Error::Integrity | Error::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Build the store's router over a shared session handle.
#[must_use]
pub fn router(store: Arc<StoreHandle>) -> Router {
    handlers::router(store)
}

/// Serve the store on an already-bound listener. Binding is left to the
/// caller so tests can grab an ephemeral port first.
///
/// ## Errors
/// Propagates listener registration and connection-handling failures.
pub async fn serve(store: Arc<StoreHandle>, listener: TcpListener) -> Result<(), hyper::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "oblivious store listening");
    }
    axum::Server::from_tcp(listener)?
        .serve(router(store).into_make_service())
        .await
}
