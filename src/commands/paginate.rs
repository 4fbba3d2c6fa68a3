//! Split a resolved document into page files

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::write_pages;
use crate::paginate::Measurement;
use crate::Affidavit;

/// Paginate `input` at `width` (or the configured page width) into `out_dir`
pub fn run(app: &Affidavit, input: &Path, width: Option<&str>, out_dir: &Path) -> Result<()> {
    let document = fs::read_to_string(input)
        .with_context(|| format!("Failed to read document {:?}", input))?;
    let width = match width {
        Some(w) => w.parse::<Measurement>()?,
        None => app.page_width(),
    };

    let pages = app.paginator().paginate(&document, width);
    let count = write_pages(out_dir, &pages)?;
    tracing::info!("Wrote {} pages to {:?}", count, out_dir);
    println!("{} pages", count);
    Ok(())
}
