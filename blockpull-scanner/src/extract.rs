use crate::model::{CategoryPath, Flavor, Item};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lower-cases and collapses every run of non `[a-z0-9]` characters to a
/// single `-`, trimming separators from both ends.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            out.push(c);
        } else {
            pending_separator = true;
        }
    }

    out
}

/// Directory name for an item: its sanitized display name, or its
/// identifier when the name is missing or sanitizes to nothing.
pub fn item_dir_name(item: &Item) -> Option<String> {
    item.name
        .as_deref()
        .map(sanitize_name)
        .filter(|name| !name.is_empty())
        .or_else(|| item.identifier().and_then(|id| path_safe_identifier(&id)))
}

/// Keeps an identifier verbatim except for path separators, which become
/// `_`. Identifiers that would still name `.` or `..` are rejected.
fn path_safe_identifier(id: &str) -> Option<String> {
    let safe: String = id
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    match safe.trim() {
        "" | "." | ".." => None,
        _ => Some(safe),
    }
}

/// Flavors written so far per (category path, item directory).
#[derive(Debug, Default)]
pub struct ExtractionLedger {
    written: HashMap<(CategoryPath, String), HashSet<Flavor>>,
}

impl ExtractionLedger {
    /// Returns `false` when this flavor was already recorded for the item.
    pub fn record(&mut self, path: &CategoryPath, item: &str, flavor: Flavor) -> bool {
        self.written
            .entry((path.clone(), item.to_string()))
            .or_default()
            .insert(flavor)
    }

    pub fn flavors_for(&self, path: &CategoryPath, item: &str) -> Option<&HashSet<Flavor>> {
        self.written.get(&(path.clone(), item.to_string()))
    }

    pub fn artifact_count(&self) -> usize {
        self.written.values().map(HashSet::len).sum()
    }
}

/// Writes snippets to `{root}/{category}/{subcategory}/{item}/{flavor}.{ext}`.
pub struct Extractor {
    output_root: PathBuf,
    ledger: ExtractionLedger,
}

impl Extractor {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ledger: ExtractionLedger::default(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn ledger(&self) -> &ExtractionLedger {
        &self.ledger
    }

    pub fn item_dir(&self, path: &CategoryPath, item_name: &str) -> PathBuf {
        let mut dir = self.output_root.join(&path.category);
        for segment in path.subcategory.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        dir.join(item_name)
    }

    /// Creates the item directory and writes its snippet, if any.
    ///
    /// Returns the written file, or `None` for items without a snippet, with
    /// an unrecognized snippet flavor, or whose flavor was already written
    /// in this run.
    pub fn extract(&mut self, path: &CategoryPath, item: &Item) -> io::Result<Option<PathBuf>> {
        let Some(name) = item_dir_name(item).filter(|n| !n.is_empty()) else {
            debug!("Skipping item without name or identifier in {}", path);
            return Ok(None);
        };

        let dir = self.item_dir(path, &name);
        fs::create_dir_all(&dir)?;

        let Some(snippet) = item.snippet.as_ref() else {
            return Ok(None);
        };
        let Some(flavor) = snippet.flavor() else {
            debug!("Ignoring snippet with unknown flavor '{}' for {}", snippet.name, name);
            return Ok(None);
        };

        if !self.ledger.record(path, &name, flavor) {
            debug!("{} already saved for {}/{}", flavor, path, name);
            return Ok(None);
        }

        let file = dir.join(flavor.artifact_name());
        fs::write(&file, &snippet.code)?;
        info!("Saved {}: {}/{}", flavor, path, name);
        Ok(Some(file))
    }
}
