pub mod config;
pub mod error;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod sku;
