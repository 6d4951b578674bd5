//! Release Gate - validation and publishing for multi-workspace repositories
//!
//! Finds the workspaces of a Cargo or npm repository, orders them by their
//! in-repo dependencies, checks that every modified or unpublished one is
//! ready for release and publishes them in dependency order.
//!
//! # Examples
//!
//! ## Classifying a version increase
//!
//! ```
//! use release_gate::{types::ReleaseType, version::classify_increase, Version};
//!
//! let previous = Version::parse("1.2.3").unwrap();
//! let current = Version::parse("1.3.0").unwrap();
//! assert_eq!(classify_increase(&previous, &current), Some(ReleaseType::Minor));
//! ```
//!
//! ## Reading a changelog
//!
//! ```
//! use release_gate::{
//!     changelog::classify_changelog,
//!     types::{ChangelogDiff, ReleaseType},
//!     Version,
//! };
//!
//! let text = "## 2.0.0\n### Breaking Changes\n- Removed `foo`.\n";
//! let version = Version::parse("2.0.0").unwrap();
//! assert_eq!(
//!     classify_changelog(Some(text), &version),
//!     ChangelogDiff::Documented(ReleaseType::Major)
//! );
//! ```

pub mod changelog;
pub mod commands;
pub mod config;
pub mod error;
pub mod graph;
pub mod lookup;
pub mod types;
pub mod utils;
pub mod version;

pub use commands::{check, list, release};

pub use semver::Version;

pub type Result<T> = anyhow::Result<T>;
