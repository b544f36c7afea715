//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use nexus_harvest_core::{
    CrawlConfig, DEFAULT_DOWNLOAD_ROOT, DEFAULT_OUTPUT_FILE, DEFAULT_WORKERS,
};

/// Crawl a Nexus repository manager and export a deduplicated artifact catalog.
///
/// nexus-harvest walks every maven2 repository of the requested type, searches
/// for artifacts with the given extension, collapses versioned renames of the
/// same artifact, downloads the surviving POM descriptors and writes one CSV
/// line per artifact.
#[derive(Parser, Debug)]
#[command(name = "nexus-harvest")]
#[command(author, version, about)]
pub struct Args {
    /// Base URL of the repository manager, e.g. https://nexus.internal:8443
    #[arg(short, long)]
    pub server: String,

    /// Artifact extension to collect, e.g. jar or war
    #[arg(short, long)]
    pub extension: String,

    /// Restrict the search to one group
    #[arg(short, long)]
    pub group: Option<String>,

    /// Repository type to crawl
    #[arg(short = 't', long = "type", default_value = "hosted")]
    pub repository_type: String,

    /// Report file, truncated on every run
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FILE)]
    pub file: PathBuf,

    /// Directory POM descriptors are downloaded under; deleted on every run
    #[arg(short, long, default_value = DEFAULT_DOWNLOAD_ROOT)]
    pub download: PathBuf,

    /// Username for HTTP basic auth
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password for HTTP basic auth
    #[arg(short, long)]
    pub password: Option<String>,

    /// Workers in each crawl pool (1-100)
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub workers: u8,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Builds the pipeline settings out of the parsed arguments.
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            extension: self.extension.clone(),
            group: self.group.clone(),
            repository_type: self.repository_type.clone(),
            output_file: self.file.clone(),
            download_root: self.download.clone(),
            search_workers: usize::from(self.workers),
            enrich_workers: usize::from(self.workers),
        }
    }
}
