mod client;
mod error;
pub mod types;

pub use client::AzureClient;
pub use error::ApiError;
pub use types::*;
