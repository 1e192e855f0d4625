pub mod api;
pub mod config;
pub mod features;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod scorer;
pub mod source;
pub mod subgraph;
pub mod synthetic;
pub mod table;
