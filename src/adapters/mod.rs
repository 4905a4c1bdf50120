// Adapters layer: concrete implementations of the domain ports.

pub mod http;
pub mod memory;
pub mod storage;

pub use http::HttpFetcher;
pub use memory::MemoryFetcher;
pub use storage::LocalStorage;
