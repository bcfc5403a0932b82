//! Storage module for S3-compatible backends
//!
//! Supports MinIO, Cloudflare R2, Backblaze B2, AWS S3 and the S3 endpoint
//! of Supabase Storage.

mod s3_client;
mod traits;
mod types;

pub use s3_client::S3Client;
pub use traits::BlobStore;
pub use types::*;
