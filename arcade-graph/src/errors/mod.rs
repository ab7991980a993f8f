//! Error types for the graph services.
mod graph;

pub use graph::GraphError;
