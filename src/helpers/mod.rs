mod transport;

pub use transport::{InMemoryStore, Transport};
