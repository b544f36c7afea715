//! Domain types shared across the crawl pipeline.
//!
//! The interesting part lives on [`Artifact`]: some projects publish every
//! release under a distinct artifact name (`lib-1.2.0`, `lib-1.3.0`, ...), so
//! the version-carrying tail is split off the name at construction time. The
//! remainder ([`Artifact::real_name`]) is what deduplication groups on.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

/// Matches the version-carrying tail of an artifact name: a `_` or `-`
/// separator, an optional `v`, then a digit and everything after it.
#[allow(clippy::expect_used)]
static VERSION_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[_-]v?\d.*").expect("version suffix regex is valid") // Static pattern, safe to panic
});

/// A repository entry from the repository listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub name: String,
    /// Repository format, e.g. `maven2` or `npm`.
    #[serde(default)]
    pub format: String,
    /// `hosted`, `proxy` or `group`.
    #[serde(rename = "type", default)]
    pub repo_type: String,
    #[serde(default)]
    pub url: String,
}

impl Repository {
    /// True when the repository name advertises snapshot content.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        contains_snapshot(&self.name)
    }
}

/// One maven2 artifact selected from a search page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub repository: String,
    pub group: String,
    pub name: String,
    pub version: String,
    /// URL of the asset matching the requested extension.
    pub download_url: String,
    /// URL of the POM asset, when the item has one.
    pub pom_url: Option<String>,
    /// `name` with the version-carrying tail removed; equals `name` when the
    /// name carries no version.
    pub real_name: String,
    /// The tail split off `name`, minus the separator character. Empty when
    /// `name` carries no version.
    pub name_encoded_version: String,
    /// Project name read from the POM descriptor; empty until enriched.
    pub full_name: String,
    /// Project description read from the POM descriptor; empty until enriched.
    pub description: String,
}

impl Artifact {
    /// Builds an artifact and derives its name split.
    #[must_use]
    pub fn new(
        repository: impl Into<String>,
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        download_url: impl Into<String>,
        pom_url: Option<String>,
    ) -> Self {
        let name = name.into();
        let real_name = VERSION_SUFFIX.replace(&name, "").into_owned();
        let name_encoded_version = if real_name == name {
            String::new()
        } else {
            // The character right after the real name is the 1-byte separator.
            name.get(real_name.len() + 1..)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            repository: repository.into(),
            group: group.into(),
            name,
            version: version.into(),
            download_url: download_url.into(),
            pom_url,
            real_name,
            name_encoded_version,
            full_name: String::new(),
            description: String::new(),
        }
    }

    /// Key under which versioned renames of the same artifact collide.
    #[must_use]
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.repository.clone(),
            self.group.clone(),
            self.real_name.clone(),
        )
    }

    /// Ordering string used to pick the survivor among colliding artifacts.
    ///
    /// The name-encoded version is deliberately more significant than the
    /// maven version: a name that still carries a version tail encodes the
    /// release the publisher actually meant.
    #[must_use]
    pub fn version_rank(&self) -> String {
        format!("{}{}", self.name_encoded_version, self.version)
    }

    /// True when the owning repository or the artifact name advertises
    /// snapshot content.
    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        contains_snapshot(&self.repository) || contains_snapshot(&self.name)
    }
}

fn contains_snapshot(value: &str) -> bool {
    value.to_ascii_lowercase().contains("snapshot")
}
