//! Mock implementations of the data layer's interfaces.

pub mod graph_api;

pub use graph_api::{create_mock_graph_api, MockGraphApi};
