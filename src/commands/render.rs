//! Render a template against a data file

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::load_data;
use crate::Affidavit;

/// Render `template` with `data`, writing to `out` or stdout
pub fn run(app: &Affidavit, template: &Path, data: &Path, out: Option<&Path>) -> Result<()> {
    let html = render_file(app, template, data)?;
    match out {
        Some(path) => {
            fs::write(path, &html).with_context(|| format!("Failed to write {:?}", path))?;
            tracing::info!("Rendered {:?} to {:?}", template, path);
        }
        None => print!("{}", html),
    }
    Ok(())
}

/// Resolved HTML for a template file and a JSON data file
pub fn render_file(app: &Affidavit, template: &Path, data: &Path) -> Result<String> {
    let source = fs::read_to_string(template)
        .with_context(|| format!("Failed to read template {:?}", template))?;
    let data = load_data(data)?;
    Ok(app.renderer().render_json(&source, &data))
}
