//! Storage sub-client: file upload/download over the shared transport.

pub mod client;

pub use client::{FileMetadata, StorageClient, UploadRequest};
