//! Render and paginate in one go

use anyhow::Result;
use std::path::Path;

use super::render::render_file;
use super::write_pages;
use crate::Affidavit;

/// Render `template` with `data` and write one HTML file per page into `out_dir`
pub fn run(app: &Affidavit, template: &Path, data: &Path, out_dir: &Path) -> Result<usize> {
    let start = std::time::Instant::now();

    let html = render_file(app, template, data)?;
    let pages = app.paginator().paginate(&html, app.page_width());
    let count = write_pages(out_dir, &pages)?;

    tracing::info!(
        "Previewed {:?} as {} pages in {:?}",
        template,
        count,
        start.elapsed()
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use std::fs;

    #[test]
    fn test_preview_writes_pages() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("affidavit.html");
        let data = dir.path().join("job.json");
        let out = dir.path().join("out");

        let sections: String = (0..4)
            .map(|_| r#"<div style="height: 500px">{{recipient_name}}</div>"#)
            .collect();
        fs::write(
            &template,
            format!(r#"<div class="page" style="width: [[PAGE_WIDTH]]">{}</div>"#, sections),
        )
        .unwrap();
        fs::write(&data, r#"{"recipient_name": "J. Doe"}"#).unwrap();

        let app = Affidavit::new(RenderConfig::default());
        let count = run(&app, &template, &data, &out).unwrap();
        assert_eq!(count, 4);

        let first = fs::read_to_string(out.join("page-001.html")).unwrap();
        assert!(first.contains("J. Doe"));
        assert!(first.contains(r#"style="width: 8.5in""#));
        assert!(out.join("page-004.html").exists());
    }

    #[test]
    fn test_missing_data_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("t.html");
        fs::write(&template, "{{name}}").unwrap();
        let app = Affidavit::new(RenderConfig::default());
        let err = run(&app, &template, &dir.path().join("nope.json"), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read data"));
    }
}
