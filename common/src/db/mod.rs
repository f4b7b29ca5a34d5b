pub mod core;
pub mod error;
pub mod graph;
pub mod indices;
pub mod parser;
