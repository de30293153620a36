//! Wire contracts of the store's HTTP surface. Bodies are JSON; ciphertext
//! cells travel hex-encoded. Reads are `GET` with query parameters so they
//! stay trivially retryable; mutations are `POST`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Route table. Mutations and reads on the same resource share a path and
/// differ by method (`/sort/pair` is `GetPair` on GET and `WritePair` on
/// POST).
pub mod paths {
    pub const ECHO: &str = "/echo";

    pub const ELEMENTS: &str = "/elements";
    pub const ELEMENTS_BATCH: &str = "/elements/batch";
    pub const ELEMENTS_FINALIZE: &str = "/elements/finalize";
    pub const ELEMENTS_CELL: &str = "/elements/cell";

    pub const HASHES: &str = "/hashes";
    pub const HASHES_VALUE: &str = "/hashes/value";
    pub const HASHES_FINALIZE: &str = "/hashes/finalize";

    pub const SORT: &str = "/sort";
    pub const SORT_FROM_HASHES: &str = "/sort/from-hashes";
    pub const SORT_PAIR: &str = "/sort/pair";
    pub const SORT_MATE: &str = "/sort/mate";
    pub const SORT_FINAL: &str = "/sort/final";
}

/// A ciphertext cell as it travels on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexCell(#[serde(with = "hex::serde")] pub Vec<u8>);

impl From<Bytes> for HexCell {
    fn from(cell: Bytes) -> Self {
        Self(cell.to_vec())
    }
}

impl From<HexCell> for Bytes {
    fn from(cell: HexCell) -> Self {
        Bytes::from(cell.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitializeElementsRequest {
    pub total: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadElementsRequest {
    pub start: u32,
    pub cells: Vec<HexCell>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeElementsResponse {
    pub stored: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadElementQuery {
    pub position: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadElementResponse {
    pub cell: HexCell,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitializeHashesRequest {
    pub expected: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreHashRequest {
    pub index: u32,
    pub cell: HexCell,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeHashesResponse {
    pub received: u32,
    pub expected: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub cells: Vec<HexCell>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArraySizeResponse {
    pub array_size: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetPairQuery {
    pub a: u32,
    pub b: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetPairResponse {
    pub cell_a: HexCell,
    pub cell_b: HexCell,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WritePairRequest {
    pub a: u32,
    pub b: u32,
    pub cell_a: HexCell,
    pub cell_b: HexCell,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetMateQuery {
    pub size: u32,
    pub seed: u64,
    pub index: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetMateResponse {
    pub mate: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalArrayResponse {
    pub cells: Vec<HexCell>,
    pub comparisons: u64,
    pub writes: u64,
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{GetPairResponse, HexCell};

    #[test]
    fn cells_travel_as_hex() {
        let response = GetPairResponse {
            cell_a: HexCell(vec![0xde, 0xad]),
            cell_b: HexCell(vec![0xbe, 0xef]),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"dead\""));
        assert!(json.contains("\"beef\""));

        let parsed: GetPairResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response.cell_a, parsed.cell_a);
        assert_eq!(Bytes::from(parsed.cell_b), Bytes::from(vec![0xbe, 0xef]));
    }
}
