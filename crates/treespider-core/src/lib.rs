/// TreeSpider Core: scanning, classification, analysis and archives.
///
/// This crate contains all business logic with zero UI dependencies. The
/// `treespider` binary is one thin front end over it.
///
/// # Modules
///
/// - [`model`]: The scanned tree (files, directories, links) and its report.
/// - [`classify`]: Tiered content-type detection (extension, then byte signature).
/// - [`scanner`]: Sequential and fork-join parallel directory walks.
/// - [`analysis`]: Read-only queries: top-N, duplicates, search, type frequency.
/// - [`archive`]: zstd-compressed JSON persistence of tree + report.
/// - [`config`]: TOML configuration.
/// - [`platform`]: Host/volume descriptors, attributes and timestamps.
pub mod analysis;
pub mod archive;
pub mod classify;
pub mod config;
pub mod error;
pub mod model;
pub mod platform;
pub mod scanner;

pub use error::{Result, SpiderError};
