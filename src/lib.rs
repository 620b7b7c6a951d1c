//! Resource ingestion and reconciliation engine of a desktop media library.
//!
//! Dropped files become catalog records after deduplication, catalogs are
//! audited against the disk, and folders are compressed or extracted through
//! an installed WinRAR or 7-Zip.

pub mod app;
pub mod archive;
pub mod config;
pub mod core;
pub mod platform;
pub mod utils;
