//! Catalog artifact loaders
//!
//! Reads item records from JSON (array) or JSON Lines files, and query
//! vectors from JSON arrays.

use crate::catalog::Item;
use crate::embedding::Embedding;
use crate::error::{FindabilityError, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

/// Load catalog items, picking the format from the file extension
pub fn load_catalog(path: &Path) -> Result<Vec<Item>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    let items = match extension.as_str() {
        "jsonl" | "ndjson" => load_catalog_jsonl(path)?,
        _ => load_catalog_json(path)?,
    };

    tracing::info!("Loaded {} catalog items from {:?}", items.len(), path);
    Ok(items)
}

/// Load a JSON array of items
pub fn load_catalog_json(path: &Path) -> Result<Vec<Item>> {
    let reader = BufReader::new(File::open(path)?);
    let items: Vec<Item> = serde_json::from_reader(reader)?;
    Ok(items)
}

/// Load one item per line, skipping blank lines
pub fn load_catalog_jsonl(path: &Path) -> Result<Vec<Item>> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item: Item = serde_json::from_str(&line).map_err(|e| {
            FindabilityError::corrupt(format!("{:?} line {}: {}", path, line_no + 1, e))
        })?;
        items.push(item);
    }

    Ok(items)
}

/// Write items as a pretty-printed JSON array
pub fn save_catalog(path: &Path, items: &[Item]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, items)?;
    tracing::debug!("Saved {} catalog items to {:?}", items.len(), path);
    Ok(())
}

/// Load a precomputed query vector stored as a JSON array of numbers
pub fn load_vector(path: &Path) -> Result<Embedding> {
    let json = fs::read_to_string(path)?;
    let vector: Embedding = serde_json::from_str(&json)?;
    Ok(vector)
}
