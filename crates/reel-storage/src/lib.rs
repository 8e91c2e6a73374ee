//! Cloudflare R2 storage for finished reels.
//!
//! This crate provides:
//! - The [`ObjectStore`] trait the publisher uploads through
//! - An S3-compatible R2 client implementing it
//! - Destination key and public URL derivation

pub mod client;
pub mod error;
pub mod keys;
pub mod object_store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use keys::{public_url, reel_object_key, DEFAULT_KEY_PREFIX, VIDEO_CONTENT_TYPE};
pub use object_store::ObjectStore;
