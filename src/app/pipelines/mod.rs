pub mod mapper_pipeline;

pub use mapper_pipeline::MapperPipeline;
