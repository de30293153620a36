use async_trait::async_trait;
use bytes::Bytes;
use hyper::{client::HttpConnector, header::CONTENT_TYPE, Body, Method, Request, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::Error,
    helpers::Transport,
    net::http_serde::{
        paths, ArraySizeResponse, FinalArrayResponse, FinalizeElementsResponse,
        FinalizeHashesResponse, GetMateResponse, GetPairResponse, InitializeElementsRequest,
        InitializeHashesRequest, InitializeRequest, ReadElementResponse, StoreHashRequest,
        UploadElementsRequest, WritePairRequest,
    },
    store::FinalArray,
};

/// HTTP client for a remote oblivious store. Implements [`Transport`] so the
/// orchestrator and pipeline are transport-agnostic.
///
/// No automatic retries: every operation except the advisory write counter is
/// idempotent, so callers may retry failed requests themselves.
#[derive(Clone, Debug)]
pub struct HttpStoreClient {
    client: hyper::Client<HttpConnector>,
    base: String,
}

impl HttpStoreClient {
    /// Create a client for a store at `base`, e.g. `http://localhost:3000`.
    ///
    /// ## Errors
    /// `InvalidArgument` if `base` is not a valid HTTP URI.
    pub fn new(base: &str) -> Result<Self, Error> {
        let base = base.trim_end_matches('/').to_owned();
        base.parse::<hyper::Uri>()
            .map_err(|e| Error::invalid_argument(format!("bad store address {base}: {e}")))?;
        Ok(Self {
            client: hyper::Client::new(),
            base,
        })
    }

    async fn request(&self, req: Request<Body>) -> Result<(StatusCode, Bytes), Error> {
        let response = self.client.request(req).await.map_err(Error::transport)?;
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(Error::transport)?;
        Ok((status, body))
    }

    /// Map the store's status codes back onto the protocol error kinds.
    fn check(status: StatusCode, body: &[u8]) -> Result<(), Error> {
        let message = || String::from_utf8_lossy(body).into_owned();
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::BAD_REQUEST => Err(Error::InvalidArgument(message())),
            StatusCode::PRECONDITION_FAILED => Err(Error::FailedPrecondition(message())),
            StatusCode::RANGE_NOT_SATISFIABLE => Err(Error::OutOfRange(message())),
            s => Err(Error::transport(format!("store returned {s}: {}", message()))),
        }
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Bytes, Error> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("{}{path}", self.base))
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::to_vec(body).map_err(Error::transport)?,
            ))
            .map_err(Error::transport)?;
        let (status, body) = self.request(request).await?;
        Self::check(status, &body)?;
        Ok(body)
    }

    async fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, Error> {
        let body = self.post(path, body).await?;
        serde_json::from_slice(&body).map_err(Error::transport)
    }

    async fn get_json<R: DeserializeOwned>(&self, path_and_query: &str) -> Result<R, Error> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(format!("{}{path_and_query}", self.base))
            .body(Body::empty())
            .map_err(Error::transport)?;
        let (status, body) = self.request(request).await?;
        Self::check(status, &body)?;
        serde_json::from_slice(&body).map_err(Error::transport)
    }
}

#[async_trait]
impl Transport for HttpStoreClient {
    async fn initialize_elements(&self, total: u32) -> Result<(), Error> {
        self.post(paths::ELEMENTS, &InitializeElementsRequest { total })
            .await?;
        Ok(())
    }

    async fn upload_elements(&self, start: u32, cells: Vec<Bytes>) -> Result<(), Error> {
        let body = UploadElementsRequest {
            start,
            cells: cells.into_iter().map(Into::into).collect(),
        };
        self.post(paths::ELEMENTS_BATCH, &body).await?;
        Ok(())
    }

    async fn finalize_elements(&self) -> Result<u32, Error> {
        let response: FinalizeElementsResponse =
            self.post_json(paths::ELEMENTS_FINALIZE, &()).await?;
        Ok(response.stored)
    }

    async fn read_element(&self, position: u32) -> Result<Bytes, Error> {
        let response: ReadElementResponse = self
            .get_json(&format!("{}?position={position}", paths::ELEMENTS_CELL))
            .await?;
        Ok(response.cell.into())
    }

    async fn initialize_hashes(&self, expected: u32) -> Result<(), Error> {
        self.post(paths::HASHES, &InitializeHashesRequest { expected })
            .await?;
        Ok(())
    }

    async fn store_hash(&self, index: u32, cell: Bytes) -> Result<(), Error> {
        let body = StoreHashRequest {
            index,
            cell: cell.into(),
        };
        self.post(paths::HASHES_VALUE, &body).await?;
        Ok(())
    }

    async fn finalize_hashes(&self) -> Result<(u32, u32), Error> {
        let response: FinalizeHashesResponse =
            self.post_json(paths::HASHES_FINALIZE, &()).await?;
        Ok((response.received, response.expected))
    }

    async fn use_hash_array_for_sorting(&self) -> Result<u32, Error> {
        let response: ArraySizeResponse = self.post_json(paths::SORT_FROM_HASHES, &()).await?;
        Ok(response.array_size)
    }

    async fn initialize(&self, cells: Vec<Bytes>) -> Result<u32, Error> {
        let body = InitializeRequest {
            cells: cells.into_iter().map(Into::into).collect(),
        };
        let response: ArraySizeResponse = self.post_json(paths::SORT, &body).await?;
        Ok(response.array_size)
    }

    async fn get_pair(&self, a: u32, b: u32) -> Result<(Bytes, Bytes), Error> {
        let response: GetPairResponse = self
            .get_json(&format!("{}?a={a}&b={b}", paths::SORT_PAIR))
            .await?;
        Ok((response.cell_a.into(), response.cell_b.into()))
    }

    async fn write_pair(
        &self,
        a: u32,
        b: u32,
        cell_a: Bytes,
        cell_b: Bytes,
    ) -> Result<(), Error> {
        let body = WritePairRequest {
            a,
            b,
            cell_a: cell_a.into(),
            cell_b: cell_b.into(),
        };
        self.post(paths::SORT_PAIR, &body).await?;
        Ok(())
    }

    async fn get_mate(&self, size: u32, seed: u64, index: u32) -> Result<u32, Error> {
        let response: GetMateResponse = self
            .get_json(&format!(
                "{}?size={size}&seed={seed}&index={index}",
                paths::SORT_MATE
            ))
            .await?;
        Ok(response.mate)
    }

    async fn final_array(&self) -> Result<FinalArray, Error> {
        let response: FinalArrayResponse = self.get_json(paths::SORT_FINAL).await?;
        Ok(FinalArray {
            cells: response.cells.into_iter().map(Into::into).collect(),
            comparisons: response.comparisons,
            writes: response.writes,
        })
    }
}
