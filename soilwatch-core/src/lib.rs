pub mod adapter;
pub mod error;
pub mod export;
pub mod feed;
pub mod ingestion_log;
pub mod ingestor;
pub mod session;
pub mod settings;
pub mod views;
pub mod window;

pub use error::SoilwatchError;
