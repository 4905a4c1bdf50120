pub mod pipelines;

pub use pipelines::MapperPipeline;
