//! Nexus Harvest Core Library
//!
//! This library provides the core functionality for the nexus-harvest tool,
//! which crawls a Nexus repository manager and exports a deduplicated CSV
//! catalog of the artifacts it hosts.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`client`] - HTTP access to the repository manager REST API
//! - [`model`] - Repository and artifact types, including the name split
//!   that powers deduplication
//! - [`search`] - Paginated artifact search with retry on flaky servers
//! - [`pom`] - POM descriptor parsing
//! - [`progress`] - Run-wide counters, status line and crawl log
//! - [`pipeline`] - The staged crawl wiring everything together

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod model;
pub mod pipeline;
pub mod pom;
pub mod progress;
pub mod search;

// Re-export commonly used types
pub use client::{ClientError, NexusClient};
pub use model::{Artifact, Repository};
pub use pipeline::{
    CrawlConfig, DEFAULT_DOWNLOAD_ROOT, DEFAULT_OUTPUT_FILE, DEFAULT_WORKERS, PipelineError,
};
pub use pom::{PomError, PomSummary, read_summary};
pub use progress::{DEFAULT_LOG_FILE, Progress, ProgressSnapshot, ProgressTasks};
pub use search::{ArtifactSearch, SearchPage};
