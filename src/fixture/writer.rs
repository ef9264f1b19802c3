// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Fixture persistence

use std::path::Path;

use serde_json::Value;

use super::{to_json, to_value};
use crate::error::{Error, ErrorContext, Result};
use crate::model::RecordedEntry;

/// Write recorded exchanges to a fixture file, replacing it
pub fn write(path: &Path, entries: &[RecordedEntry]) -> Result<()> {
    let text = to_json(entries)?;
    ensure_parent(path)?;
    std::fs::write(path, text).with_fixture(path)?;
    tracing::info!(path = %path.display(), entries = entries.len(), "Fixture written");
    Ok(())
}

/// Append recorded exchanges to a fixture file, creating it when absent
pub fn append(path: &Path, entries: &[RecordedEntry]) -> Result<()> {
    if !path.exists() {
        return write(path, entries);
    }

    let text = std::fs::read_to_string(path).with_fixture(path)?;
    let mut existing = match serde_json::from_str::<Value>(&text).with_fixture(path)? {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        other => {
            return Err(Error::fixture(
                path,
                format!("expected an entry or a list of entries, got {}", other),
            ))
        }
    };
    if let Value::Array(new) = to_value(entries)? {
        existing.extend(new);
    }

    let mut text = serde_json::to_string_pretty(&Value::Array(existing))?;
    text.push('\n');
    std::fs::write(path, text).with_fixture(path)?;
    tracing::info!(path = %path.display(), appended = entries.len(), "Fixture extended");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).with_fixture(path)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::fixture::read;
    use crate::model::{RequestDescriptor, ResponseMessage};

    fn entry(path: &str) -> RecordedEntry {
        RecordedEntry {
            request: RequestDescriptor::new("GET", &format!("http://localhost{}", path)).unwrap(),
            response: ResponseMessage {
                status: 200,
                headers: Default::default(),
                body: Body::text("ok"),
            }
            .into(),
        }
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/fixture.json");

        write(&path, &[entry("/a")]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(read(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");

        append(&path, &[entry("/a")]).unwrap();
        append(&path, &[entry("/b"), entry("/c")]).unwrap();

        let entries = read(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[2].request.as_ref().unwrap().path.as_deref(),
            Some("/c")
        );
    }
}
