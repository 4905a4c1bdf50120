pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{HttpFetcher, LocalStorage, MemoryFetcher};
pub use app::MapperPipeline;
pub use config::MapperConfig;
pub use crate::core::{BoardDiscoverer, HierarchyExtractor, MapperEngine, SelectorDetector};
pub use utils::error::{MapperError, Result};
