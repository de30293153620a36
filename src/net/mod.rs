mod client;
pub mod http_serde;
mod server;

pub use client::HttpStoreClient;
pub use server::{router, serve};
