// Library interface for portfolio_scraper
// This allows tests and the binary to share the pipeline components

pub mod browser;
pub mod config;
pub mod error;
pub mod extractor;
pub mod helpers;
pub mod http_client;
pub mod models;
pub mod pipeline;
pub mod reporter;

pub use error::{Result, ScrapeError};
