//! Writing aggregation outputs next to each other in an output directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use grid_aggregator::{AggregationSummary, DenseAggregationBuffer};

/// File stem shared by every output of one input file.
pub fn output_stem(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("points")
        .to_string()
}

/// Write `<dir>/<stem>.summary.json`.
pub fn write_summary(dir: &Path, stem: &str, summary: &AggregationSummary) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("{stem}.summary.json"));
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Write the raw dense buffer as native-endian `f32` to
/// `<dir>/<stem>.dense.f32`.
pub fn write_dense(dir: &Path, stem: &str, buffer: &DenseAggregationBuffer) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!("{stem}.dense.f32"));
    fs::write(&path, buffer.as_bytes()).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
