//! Read-only client for the S3-compatible blob store holding uploaded videos.

pub mod client;
pub mod error;

pub use client::{BlobStoreClient, BlobStoreConfig};
pub use error::{BlobError, BlobResult};
