//! Record loader
//!
//! Reads the on-disk dataset:
//! - an attribute directory with one CSV file per entity (`<ID>.txt`); the first
//!   field of each record is an attribute value, stored as `attr1`, `attr2`, …;
//! - a link file with one tab-separated `source<TAB>target` pair per line.

use csv::ReaderBuilder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{EntityRecord, RelationshipRecord};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type LoadResult<T> = Result<T, LoadError>;

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> LoadError + '_ {
    move |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Entity ID for an attribute file: the file name up to its first `.`
fn entity_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let id = name.split('.').next()?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Attribute files in `dir`, sorted by path
fn attribute_files(dir: &Path) -> LoadResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// First field of every CSV record in `path`, empty values dropped.
///
/// Quoted fields keep their commas, `""` escapes and line breaks.
fn attribute_values(path: &Path) -> csv::Result<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut values = Vec::new();
    for result in reader.records() {
        let record = result?;
        if let Some(value) = record.get(0).map(str::trim).filter(|v| !v.is_empty()) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

/// Identifiers of every entity in the attribute directory, sorted
pub fn load_identifiers(dir: impl AsRef<Path>) -> LoadResult<Vec<String>> {
    let mut ids: Vec<String> = attribute_files(dir.as_ref())?
        .iter()
        .filter_map(|p| entity_id(p))
        .collect();
    ids.sort();
    ids.dedup();
    Ok(ids)
}

/// One record per attribute file, sorted by ID. Unreadable files are skipped.
pub fn load_entities(dir: impl AsRef<Path>) -> LoadResult<Vec<EntityRecord>> {
    let dir = dir.as_ref();
    let mut records = Vec::new();

    for path in attribute_files(dir)? {
        let Some(id) = entity_id(&path) else {
            warn!("Skipping attribute file without an ID: {:?}", path);
            continue;
        };
        let values = match attribute_values(&path) {
            Ok(values) => values,
            Err(e) => {
                warn!("Skipping unreadable attribute file {:?}: {}", path, e);
                continue;
            }
        };

        let mut record = EntityRecord::new(id);
        for (i, value) in values.into_iter().enumerate() {
            record.set(format!("attr{}", i + 1), value);
        }
        records.push(record);
    }

    records.sort_by(|a, b| a.id.cmp(&b.id));
    info!("Loaded {} entities from {:?}", records.len(), dir);
    Ok(records)
}

/// Relationship pairs from the link file. Malformed lines are skipped.
pub fn load_relationships(file: impl AsRef<Path>) -> LoadResult<Vec<RelationshipRecord>> {
    let file = file.as_ref();
    let content = fs::read_to_string(file).map_err(io_err(file))?;
    let mut links = Vec::new();

    for (n, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split('\t').map(str::trim);
        match (parts.next(), parts.next()) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => {
                links.push(RelationshipRecord::new(a, b));
            }
            _ => warn!("Skipping malformed link on line {}: {:?}", n + 1, line),
        }
    }

    debug!("Loaded {} relationships from {:?}", links.len(), file);
    Ok(links)
}
