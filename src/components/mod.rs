//! Reusable view components.

pub mod round_graph;
