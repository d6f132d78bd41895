//! Core types and shared functionality for folio.
//!
//! This crate provides:
//! - SQLite record store (calendar exports, users, content, files, image cache)
//! - Media storage backends (local filesystem, S3)
//! - Image sizing, cache keys and the resized-image builder
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod image;
pub mod storage;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use storage::{FsStorage, MediaStorage};
pub use store::{ContentItem, ContentKind, ExportStatus, FileRecord, IcsExport, NewFile, Store, User};
