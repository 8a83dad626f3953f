pub mod config;
pub mod errors;
pub mod resolution;
pub mod strategy;
pub mod types;
