pub mod catalog;
pub mod charts;
pub mod clients;
pub mod config;
pub mod deserializers;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod prompts;
pub mod server;
pub mod store;
pub mod summarizer;
pub mod synthesis;
pub mod tabular;

pub use error::{Result, VsmeError};
