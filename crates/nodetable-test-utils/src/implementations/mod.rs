//! Test implementations (fakes) of the data layer's interfaces.

pub mod in_memory_graph;
pub mod recording;

pub use in_memory_graph::InMemoryGraphApi;
pub use recording::{Hold, RecordingGraphApi};
