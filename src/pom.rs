//! Reading project metadata out of downloaded POM descriptors.
//!
//! Only two fields matter for the report: `<project><name>` and
//! `<project><description>`. The parser tracks element depth so that a
//! `<developer><name>` or any other nested `name` element never leaks into
//! the summary.

use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

/// Metadata lifted from a POM descriptor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PomSummary {
    /// `<project><name>`, when present.
    pub name: Option<String>,
    /// `<project><description>`, when present.
    pub description: Option<String>,
}

/// Errors raised while reading a POM descriptor.
#[derive(Debug, Error)]
pub enum PomError {
    /// The descriptor file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not well-formed XML.
    #[error("malformed descriptor {path}: {source}")]
    Xml {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying XML error.
        #[source]
        source: quick_xml::Error,
    },
}

impl PomError {
    /// Creates an IO error tied to the descriptor path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an XML error tied to the descriptor path.
    pub fn xml(path: impl Into<PathBuf>, source: quick_xml::Error) -> Self {
        Self::Xml {
            path: path.into(),
            source,
        }
    }
}

/// Which top-level element is currently being captured.
#[derive(Debug, Clone, Copy)]
enum Field {
    Name,
    Description,
}

/// Reads `<project><name>` and `<project><description>` from the descriptor
/// at `path`.
///
/// # Errors
///
/// Returns [`PomError::Io`] when the file cannot be read and
/// [`PomError::Xml`] when it is not well-formed XML.
pub fn read_summary(path: &Path) -> Result<PomSummary, PomError> {
    let text = std::fs::read_to_string(path).map_err(|e| PomError::io(path, e))?;
    parse_summary(&text).map_err(|e| PomError::xml(path, e))
}

fn parse_summary(text: &str) -> Result<PomSummary, quick_xml::Error> {
    let mut reader = Reader::from_str(text);
    let mut summary = PomSummary::default();
    // Number of currently open elements; the document root sits at depth 1.
    let mut depth = 0usize;
    let mut capture: Option<Field> = None;
    let mut buffer = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                depth += 1;
                if depth == 2 {
                    capture = match start.local_name().as_ref() {
                        b"name" => Some(Field::Name),
                        b"description" => Some(Field::Description),
                        _ => None,
                    };
                    buffer.clear();
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    match capture.take() {
                        Some(Field::Name) => summary.name = Some(buffer.trim().to_string()),
                        Some(Field::Description) => {
                            summary.description = Some(buffer.trim().to_string());
                        }
                        None => {}
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Empty(start) => {
                if depth == 1 {
                    match start.local_name().as_ref() {
                        b"name" => summary.name = Some(String::new()),
                        b"description" => summary.description = Some(String::new()),
                        _ => {}
                    }
                }
            }
            Event::Text(chunk) => {
                if capture.is_some() && depth == 2 {
                    buffer.push_str(&chunk.unescape()?);
                }
            }
            Event::CData(data) => {
                if capture.is_some() && depth == 2 {
                    buffer.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_name_and_description() {
        let pom = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <groupId>com.example</groupId>
  <artifactId>lib</artifactId>
  <name>Example Library</name>
  <description>
    Does example things.
  </description>
</project>"#;

        let summary = parse_summary(pom).unwrap();
        assert_eq!(summary.name.as_deref(), Some("Example Library"));
        assert_eq!(summary.description.as_deref(), Some("Does example things."));
    }

    #[test]
    fn test_nested_name_elements_are_ignored() {
        let pom = r"<project>
  <developers>
    <developer>
      <name>A Developer</name>
    </developer>
  </developers>
  <description>Real description</description>
</project>";

        let summary = parse_summary(pom).unwrap();
        assert_eq!(summary.name, None);
        assert_eq!(summary.description.as_deref(), Some("Real description"));
    }

    #[test]
    fn test_unescapes_entities_and_reads_cdata() {
        let pom = r"<project>
  <name>Fast &amp; Small</name>
  <description><![CDATA[Contains <markup> literally]]></description>
</project>";

        let summary = parse_summary(pom).unwrap();
        assert_eq!(summary.name.as_deref(), Some("Fast & Small"));
        assert_eq!(
            summary.description.as_deref(),
            Some("Contains <markup> literally")
        );
    }

    #[test]
    fn test_missing_fields_stay_none() {
        let summary = parse_summary("<project><artifactId>x</artifactId></project>").unwrap();
        assert_eq!(summary, PomSummary::default());
    }

    #[test]
    fn test_self_closing_fields_read_as_empty() {
        let summary = parse_summary("<project><name/></project>").unwrap();
        assert_eq!(summary.name.as_deref(), Some(""));
        assert_eq!(summary.description, None);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pom.xml");
        std::fs::write(&path, "<project><name>oops</wrong></project>").unwrap();

        let result = read_summary(&path);
        assert!(matches!(result, Err(PomError::Xml { .. })));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = read_summary(Path::new("/nonexistent/definitely/missing.pom.xml"));
        assert!(matches!(result, Err(PomError::Io { .. })));
    }

    #[test]
    fn test_reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.pom.xml");
        std::fs::write(&path, "<project><name>On Disk</name></project>").unwrap();

        let summary = read_summary(&path).unwrap();
        assert_eq!(summary.name.as_deref(), Some("On Disk"));
    }
}
