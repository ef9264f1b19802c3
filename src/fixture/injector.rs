// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Source rewriting for record-and-inject sessions
//!
//! The first `recorded_and_injected()` call at or after the session's call
//! site line becomes `mocked_from_json(r#"..."#)` holding the recording, so
//! the next run replays instead of recording.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use super::to_json;
use crate::error::{Error, Result};
use crate::model::RecordedEntry;

lazy_static! {
    static ref CALL: Regex = Regex::new(r"recorded_and_injected\s*\(\s*\)").unwrap();
}

/// Rewrite the recording call at `line` (1-based) of `path`
pub fn inject(path: &Path, line: u32, entries: &[RecordedEntry]) -> Result<()> {
    let resolved = resolve(path);
    let source = std::fs::read_to_string(&resolved)
        .map_err(|e| Error::injection(&resolved, e.to_string()))?;
    let json = to_json(entries)?;

    let rewritten =
        inject_source(&source, line, &json).map_err(|reason| Error::injection(&resolved, reason))?;
    std::fs::write(&resolved, rewritten).map_err(|e| Error::injection(&resolved, e.to_string()))?;

    tracing::info!(
        path = %resolved.display(),
        line,
        entries = entries.len(),
        "Recording injected into source"
    );
    Ok(())
}

/// Rewrite source text, returning the new text or why it could not be done
pub fn inject_source(source: &str, line: u32, json: &str) -> std::result::Result<String, String> {
    let start = line_offset(source, line)
        .ok_or_else(|| format!("line {} is past the end of the file", line))?;

    let found = CALL
        .find_at(source, start)
        .ok_or_else(|| format!("no recorded_and_injected() call at or after line {}", line))?;

    let literal = raw_string_literal(&format!("\n{}", json));
    let mut rewritten = String::with_capacity(source.len() + literal.len());
    rewritten.push_str(&source[..found.start()]);
    rewritten.push_str("mocked_from_json(");
    rewritten.push_str(&literal);
    rewritten.push(')');
    rewritten.push_str(&source[found.end()..]);
    Ok(rewritten)
}

/// Raw string literal with the fewest `#` that keep `text` intact
pub fn raw_string_literal(text: &str) -> String {
    let mut hashes = 1;
    while text.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let fence = "#".repeat(hashes);
    format!("r{fence}\"{text}\"{fence}")
}

fn line_offset(source: &str, line: u32) -> Option<usize> {
    if line <= 1 {
        return Some(0);
    }
    source
        .match_indices('\n')
        .nth(line as usize - 2)
        .map(|(index, _)| index + 1)
}

fn resolve(path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    match std::env::var_os("CARGO_MANIFEST_DIR") {
        Some(root) => {
            let candidate = Path::new(&root).join(path);
            if candidate.exists() {
                candidate
            } else {
                path.to_path_buf()
            }
        }
        None => path.to_path_buf(),
    }
}
