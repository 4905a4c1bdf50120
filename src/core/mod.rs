pub mod discovery;
pub mod engine;
pub mod hierarchy;
pub mod selectors;

pub use crate::domain::model::{Board, Campus, DiscoveryResult, MappingOutcome, SelectorBundle};
pub use crate::domain::ports::{PageFetcher, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use discovery::{BoardDiscoverer, DiscoveryTimeouts};
pub use engine::MapperEngine;
pub use hierarchy::{DepartmentIdScheme, HierarchyExtractor};
pub use selectors::SelectorDetector;
