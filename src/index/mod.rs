pub mod inverted;
pub mod graph;
