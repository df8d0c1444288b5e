// src/lib.rs

//! pkguninst
//!
//! Removes macOS packages by their installer receipts: everything a
//! receipt says a package owns is deleted, and the receipt is forgotten.
//!
//! # Architecture
//!
//! - Receipts are read through `PackageDatabase` (`pkgutil` by default)
//! - Files are removed all-or-nothing: moved to a staging directory first,
//!   moved back if any single move fails
//! - Directories are pruned deepest first and only when empty, since other
//!   packages may share them
//! - A policy gate keeps vendor packages safe unless forced

pub mod config;
mod error;
pub mod filter;
pub mod inspect;
pub mod interaction;
pub mod interactive;
pub mod paths;
pub mod pkgdb;
pub mod policy;
pub mod prune;
pub mod relocate;
pub mod remove;
pub mod system;
pub mod volume;

pub use error::{Error, Result};
pub use filter::PackageSelector;
pub use inspect::{PackageContents, inspect_package};
pub use pkgdb::{PackageDatabase, Pkgutil, list_installed};
pub use remove::{BatchReport, RemovalOptions, RemovalOutcome, RemovalReport, Remover, SkipReason};
pub use volume::Volume;
