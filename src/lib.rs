pub mod chain;
pub mod config;
pub mod error;
pub mod filters;
pub mod model_download;
pub mod pipeline;
pub mod surface;
pub mod types;
pub mod ui;
