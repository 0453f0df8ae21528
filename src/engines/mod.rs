pub mod fitness;
pub mod generation;
pub mod materialize;
pub mod resolution;
