//! SQLite-backed record store.
//!
//! This module provides persistent storage using SQLite with async access
//! via tokio-rusqlite. It holds:
//!
//! - Calendar export records and the users allowed to read them
//! - CMS content records and the file records attached to them
//! - Resized image binaries keyed by deterministic cache keys
//!
//! Schema changes are applied through versioned migrations on open.

pub mod connection;
pub mod content;
pub mod exports;
pub mod files;
pub mod image_cache;
pub mod migrations;
pub mod users;

pub use crate::Error;

pub use connection::Store;
pub use content::{ContentItem, ContentKind};
pub use exports::{ExportStatus, IcsExport};
pub use files::{FileRecord, NewFile};
pub use image_cache::IMAGE_CACHE_TTL;
pub use users::User;

/// Fixed-width RFC 3339 timestamp, so stored values order lexicographically.
pub(crate) fn timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub(crate) fn now_rfc3339() -> String {
    timestamp(chrono::Utc::now())
}
