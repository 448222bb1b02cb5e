pub mod not_found;
pub mod round_graph;
