pub mod aggregate;
pub mod batch;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod render;
pub mod report;
pub mod store;
pub mod util;
