//! CLI commands

pub mod paginate;
pub mod preview;
pub mod render;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Read a JSON data context
pub fn load_data(path: &Path) -> Result<serde_json::Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read data {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse data {:?}", path))
}

/// Write numbered page files into `out_dir`, returning how many were written
pub fn write_pages(out_dir: &Path, pages: &[String]) -> Result<usize> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {:?}", out_dir))?;
    for (i, page) in pages.iter().enumerate() {
        let path = out_dir.join(format!("page-{:03}.html", i + 1));
        fs::write(&path, page).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::debug!("Wrote {:?}", path);
    }
    Ok(pages.len())
}
