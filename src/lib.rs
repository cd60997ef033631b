pub mod config;
pub mod detector;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod utils;
