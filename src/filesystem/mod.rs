// src/filesystem/mod.rs

//! On-disk storage for resource payloads
//!
//! Payload bytes live in a content-addressable store keyed by their SHA-256
//! digest, which gives deduplication for free: two resources shipping the
//! same bytes share one blob.

mod cas;

pub use cas::{CONTENT_FILE_NAME, ContentStore};
