pub mod advisory;
pub mod config;
pub mod fetch;
pub mod neo;
pub mod output;
