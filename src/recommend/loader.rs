//! Co-purchase CSV I/O
//!
//! Expected columns: `product_id`, `related_product_id`, `score`
//! (`source_id`, `related_id`, `weight` are accepted too). Extra columns
//! are ignored.

use crate::recommend::CoPurchaseEdge;
use crate::error::{FindabilityError, Result};
use std::path::Path;

const SOURCE_COLUMNS: [&str; 2] = ["product_id", "source_id"];
const RELATED_COLUMNS: [&str; 2] = ["related_product_id", "related_id"];
const WEIGHT_COLUMNS: [&str; 2] = ["score", "weight"];

/// Load co-purchase edges from a CSV file.
///
/// A missing file is reported as `Io`; malformed rows are `CorruptArtifact`.
pub fn load_edges(path: &Path) -> Result<Vec<CoPurchaseEdge>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.contains(&h))
            .ok_or_else(|| {
                FindabilityError::corrupt(format!(
                    "{:?} is missing a '{}' column",
                    path, names[0]
                ))
            })
    };
    let source_idx = column(&SOURCE_COLUMNS)?;
    let related_idx = column(&RELATED_COLUMNS)?;
    let weight_idx = column(&WEIGHT_COLUMNS)?;

    let mut edges = Vec::new();
    for (row_num, record) in reader.records().enumerate() {
        let record = record?;
        // Header is line 1
        let line = row_num + 2;

        let field = |idx: usize| {
            record.get(idx).ok_or_else(|| {
                FindabilityError::corrupt(format!("{:?} line {}: missing column", path, line))
            })
        };

        let source_id = field(source_idx)?.to_string();
        let related_id = field(related_idx)?.to_string();
        let weight: f32 = field(weight_idx)?.parse().map_err(|_| {
            FindabilityError::corrupt(format!(
                "{:?} line {}: score is not a number",
                path, line
            ))
        })?;

        edges.push(CoPurchaseEdge {
            source_id,
            related_id,
            weight,
        });
    }

    tracing::info!("Loaded {} co-purchase edges from {:?}", edges.len(), path);
    Ok(edges)
}

/// Write edges with the `product_id,related_product_id,score` header
pub fn save_edges(path: &Path, edges: &[CoPurchaseEdge]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["product_id", "related_product_id", "score"])?;
    for edge in edges {
        writer.write_record([
            edge.source_id.as_str(),
            edge.related_id.as_str(),
            &edge.weight.to_string(),
        ])?;
    }
    writer.flush()?;

    tracing::debug!("Saved {} co-purchase edges to {:?}", edges.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_source_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("co_purchase.csv");
        fs::write(
            &path,
            "product_id,related_product_id,score\nA, B ,0.9\nA,C,0.6\n",
        )
        .unwrap();

        let edges = load_edges(&path).unwrap();

        assert_eq!(
            edges,
            vec![
                CoPurchaseEdge::new("A", "B", 0.9),
                CoPurchaseEdge::new("A", "C", 0.6),
            ]
        );
    }

    #[test]
    fn test_alternate_headers_and_column_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edges.csv");
        fs::write(&path, "weight,note,related_id,source_id\n10,x,B,A\n").unwrap();

        let edges = load_edges(&path).unwrap();
        assert_eq!(edges, vec![CoPurchaseEdge::new("A", "B", 10.0)]);
    }

    #[test]
    fn test_bad_score_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edges.csv");
        fs::write(&path, "product_id,related_product_id,score\nA,B,high\n").unwrap();

        assert!(matches!(
            load_edges(&path),
            Err(FindabilityError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_missing_column_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("edges.csv");
        fs::write(&path, "product_id,score\nA,1\n").unwrap();

        assert!(matches!(
            load_edges(&path),
            Err(FindabilityError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let edges = vec![
            CoPurchaseEdge::new("A", "B", 0.9),
            CoPurchaseEdge::new("B", "A", 0.3),
        ];

        save_edges(&path, &edges).unwrap();
        assert_eq!(load_edges(&path).unwrap(), edges);
    }
}
