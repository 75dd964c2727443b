//! Frame annotation

pub mod draw;
pub mod pipeline;

pub use pipeline::AnnotationPipeline;
