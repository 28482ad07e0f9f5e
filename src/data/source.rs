use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use crate::error::GeoCsvError;

/// Marker that opens a metadata line.
pub const MARKER: char = '#';

/// Where GeoCSV text comes from.
#[derive(Debug, Clone)]
pub enum Source {
    File(PathBuf),
    /// In-memory text; `name` only appears in diagnostics.
    Text { name: String, text: String },
}

impl Source {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Source::File(path.as_ref().to_path_buf())
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Source::Text {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::Text { name, .. } => name.clone(),
        }
    }

    /// Read every line into memory. Line terminators are removed.
    pub fn read_lines(&self) -> Result<Vec<String>, GeoCsvError> {
        match self {
            Source::Text { text, .. } => Ok(text.lines().map(str::to_string).collect()),
            Source::File(path) => {
                let file = File::open(path).map_err(|e| self.open_error(e))?;
                BufReader::new(file)
                    .lines()
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|cause| GeoCsvError::SourceRead {
                        name: self.name(),
                        cause,
                    })
            }
        }
    }

    fn open_error(&self, cause: std::io::Error) -> GeoCsvError {
        if cause.kind() == ErrorKind::NotFound {
            GeoCsvError::SourceNotFound { name: self.name() }
        } else {
            GeoCsvError::SourceRead {
                name: self.name(),
                cause,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Metadata,
    Data,
}

/// A line is metadata when its trimmed content starts with [`MARKER`].
pub fn classify(line: &str) -> LineKind {
    if line.trim().starts_with(MARKER) {
        LineKind::Metadata
    } else {
        LineKind::Data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn classify_trims_before_checking_marker() {
        assert_eq!(classify("#title: x"), LineKind::Metadata);
        assert_eq!(classify("   # indented"), LineKind::Metadata);
        assert_eq!(classify("iso_time,ship_longitude"), LineKind::Data);
        assert_eq!(classify("a,#b"), LineKind::Data);
        assert_eq!(classify(""), LineKind::Data);
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let dir = tempdir().unwrap();
        let src = Source::file(dir.path().join("nope.geoCSV"));
        match src.read_lines() {
            Err(GeoCsvError::SourceNotFound { name }) => assert!(name.ends_with("nope.geoCSV")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_is_source_read_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.geoCSV");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"#title: ok\n\xff\xfe\n").unwrap();

        assert!(matches!(
            Source::file(&path).read_lines(),
            Err(GeoCsvError::SourceRead { .. })
        ));
    }

    #[test]
    fn crlf_terminators_are_removed() {
        let src = Source::text("mem", "#a: 1\r\nx,y\r\n1,2\r\n");
        let lines = src.read_lines().unwrap();
        assert_eq!(lines, vec!["#a: 1", "x,y", "1,2"]);
    }
}
