//! Pagination of resolved documents
//!
//! A document is parsed once, its content blocks are measured through a
//! [`MeasurementPort`], [`plan_pages`] folds the heights into page groups,
//! and each group is serialized as a self-contained fragment. Any failure
//! along the way falls back to the whole document as a single page.

mod css;
pub mod document;
pub mod measure;
pub mod plan;

use thiserror::Error;

use crate::config::PageConfig;
pub use document::{Block, Layout, SourceDocument};
pub use measure::{EstimatingMeasurer, MeasureError, Measurement, MeasurementPort};
pub use plan::{plan_pages, BlockMetrics};

/// Errors raised while paginating; never returned from [`Paginator::paginate`]
#[derive(Error, Debug)]
pub enum PaginateError {
    #[error("Document has no content container")]
    NoContainer,

    #[error("Measurement failed: {0}")]
    Measure(#[from] MeasureError),
}

/// Splits resolved documents into fixed-height pages
#[derive(Debug, Clone)]
pub struct Paginator<M> {
    measurer: M,
    page: PageConfig,
}

impl<M: MeasurementPort> Paginator<M> {
    pub fn new(measurer: M, page: PageConfig) -> Self {
        Self { measurer, page }
    }

    pub fn page(&self) -> &PageConfig {
        &self.page
    }

    /// Paginate a document; always returns at least one fragment
    pub fn paginate(&self, document: &str, width: Measurement) -> Vec<String> {
        match self.try_paginate(document, width) {
            Ok(pages) if !pages.is_empty() => pages,
            Ok(_) => vec![document.to_string()],
            Err(e) => {
                tracing::warn!("Pagination failed, returning the document as one page: {}", e);
                vec![document.to_string()]
            }
        }
    }

    /// Paginate, reporting what went wrong instead of falling back
    pub fn try_paginate(&self, document: &str, width: Measurement) -> Result<Vec<String>, PaginateError> {
        let source = SourceDocument::parse(document, &self.page.page_class)?;

        let blocks = match source.layout() {
            Layout::PrePaginated(pages) => {
                tracing::debug!("Document is pre-paginated into {} pages", pages.len());
                return Ok(source.page_fragments());
            }
            Layout::Flowing(blocks) if blocks.is_empty() => {
                tracing::debug!("Content container is empty, nothing to paginate");
                return Ok(vec![document.to_string()]);
            }
            Layout::Flowing(blocks) => blocks,
        };

        let content_width = source.content_width(width);
        let metrics = blocks
            .iter()
            .map(|block| {
                let markup = source.measurement_markup(block);
                let height = self
                    .measurer
                    .measure_height(&markup, content_width, source.styles())?;
                Ok(BlockMetrics::new(height, block.keep_together))
            })
            .collect::<Result<Vec<_>, MeasureError>>()?;

        let usable = self.page.usable_height();
        let plan = plan_pages(&metrics, usable);
        tracing::debug!(
            "Planned {} blocks onto {} pages ({}px usable)",
            blocks.len(),
            plan.len(),
            usable
        );

        Ok(plan
            .into_iter()
            .map(|range| source.fragment(&blocks[range], width))
            .collect())
    }
}

impl Default for Paginator<EstimatingMeasurer> {
    fn default() -> Self {
        Self::new(EstimatingMeasurer::default(), PageConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::TendrilSink;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns scripted heights in call order; fails once they run out
    struct ScriptedMeasurer {
        heights: Vec<f64>,
        calls: AtomicUsize,
    }

    impl ScriptedMeasurer {
        fn new(heights: &[f64]) -> Self {
            Self {
                heights: heights.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl MeasurementPort for ScriptedMeasurer {
        fn measure_height(&self, _html: &str, _width: Measurement, _styles: &str) -> Result<f64, MeasureError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.heights
                .get(call)
                .copied()
                .ok_or_else(|| MeasureError::Failed(format!("no height scripted for call {}", call)))
        }
    }

    fn paginator(heights: &[f64]) -> Paginator<ScriptedMeasurer> {
        Paginator::new(ScriptedMeasurer::new(heights), PageConfig::default())
    }

    fn document(n: usize) -> String {
        let blocks: String = (0..n).map(|i| format!("<p>Block {}</p>", i)).collect();
        format!(
            r#"<style>.page {{ font-size: 12pt; }}</style><div class="affidavit"><div class="page">{}</div></div>"#,
            blocks
        )
    }

    /// Serialized blocks of each fragment's page
    fn page_blocks(fragment: &str) -> Vec<String> {
        let doc = kuchiki::parse_html().one(fragment);
        let page = doc.select_first(".page").unwrap();
        page.as_node()
            .children()
            .filter(|c| c.as_element().is_some())
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn test_five_equal_blocks() {
        let pages = paginator(&[400.0; 5]).paginate(&document(5), Measurement::inches(8.5));
        let groups: Vec<usize> = pages.iter().map(|p| page_blocks(p).len()).collect();
        assert_eq!(groups, vec![2, 2, 1]);
    }

    #[test]
    fn test_oversized_block_gets_own_page() {
        let pages = paginator(&[1200.0, 300.0, 300.0]).paginate(&document(3), Measurement::inches(8.5));
        assert_eq!(pages.len(), 2);
        assert_eq!(page_blocks(&pages[0]), vec!["<p>Block 0</p>"]);
        assert_eq!(page_blocks(&pages[1]), vec!["<p>Block 1</p>", "<p>Block 2</p>"]);
    }

    #[test]
    fn test_fragments_are_self_contained() {
        let pages = paginator(&[600.0, 600.0]).paginate(&document(2), Measurement::inches(8.5));
        assert_eq!(pages.len(), 2);
        for page in &pages {
            assert!(page.starts_with("<style>.page { font-size: 12pt; }</style><div class=\"affidavit\">"));
            assert!(page.contains(r#"<div class="page" style="width: 816px">"#));
        }
        assert_eq!(
            pages[1],
            r#"<style>.page { font-size: 12pt; }</style><div class="affidavit"><div class="page" style="width: 816px"><p>Block 1</p></div></div>"#
        );
    }

    #[test]
    fn test_content_is_preserved_in_order() {
        let heights: Vec<f64> = (0..12).map(|i| 150.0 + (i * 97 % 500) as f64).collect();
        let pages = paginator(&heights).paginate(&document(12), Measurement::inches(8.5));
        let recovered: Vec<String> = pages.iter().flat_map(|p| page_blocks(p)).collect();
        let expected: Vec<String> = (0..12).map(|i| format!("<p>Block {}</p>", i)).collect();
        assert_eq!(recovered, expected);
        assert!(pages.len() > 1);
    }

    #[test]
    fn test_keep_together_block_starts_fresh_page() {
        let html = r#"<div class="page"><p>intro</p><div style="page-break-inside: avoid">sig</div><p>after</p></div>"#;
        let pages = paginator(&[800.0, 300.0, 100.0]).paginate(html, Measurement::inches(8.5));
        assert_eq!(pages.len(), 2);
        assert_eq!(page_blocks(&pages[0]), vec!["<p>intro</p>"]);
        assert_eq!(page_blocks(&pages[1])[0], r#"<div style="page-break-inside: avoid">sig</div>"#);
    }

    #[test]
    fn test_pre_paginated_passthrough() {
        let html = r#"<div class="doc"><div class="page">One</div><div class="page">Two</div><div class="page">Three</div></div>"#;
        let p = paginator(&[]);
        let pages = p.paginate(html, Measurement::inches(8.5));
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2], r#"<div class="doc"><div class="page">Three</div></div>"#);
        assert_eq!(p.measurer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_container_returns_document() {
        let html = r#"<div class="page">   </div>"#;
        assert_eq!(paginator(&[]).paginate(html, Measurement::inches(8.5)), vec![html.to_string()]);
    }

    #[test]
    fn test_measure_failure_falls_back() {
        let html = document(3);
        let p = paginator(&[100.0]);
        assert!(matches!(
            p.try_paginate(&html, Measurement::inches(8.5)),
            Err(PaginateError::Measure(_))
        ));
        assert_eq!(paginator(&[100.0]).paginate(&html, Measurement::inches(8.5)), vec![html]);
    }

    #[test]
    fn test_no_container_falls_back() {
        assert_eq!(
            paginator(&[]).paginate("just text", Measurement::inches(8.5)),
            vec!["just text".to_string()]
        );
    }

    #[test]
    fn test_estimating_measurer_end_to_end() {
        let blocks: String = (0..6)
            .map(|i| format!(r#"<div style="height: 300px">Section {}</div>"#, i))
            .collect();
        let html = format!(r#"<div class="page" style="width: 8.5in">{}</div>"#, blocks);
        let pages = Paginator::default().paginate(&html, Measurement::inches(8.5));
        let groups: Vec<usize> = pages.iter().map(|p| page_blocks(p).len()).collect();
        assert_eq!(groups, vec![3, 3]);
    }

    #[test]
    fn test_top_level_blocks_are_all_paginated() {
        let html = "<p>one</p><p>two</p><p>three</p>";
        let pages = paginator(&[600.0, 600.0, 600.0]).paginate(html, Measurement::inches(8.5));
        let recovered: Vec<String> = pages.iter().flat_map(|p| page_blocks(p)).collect();
        assert_eq!(recovered, vec!["<p>one</p>", "<p>two</p>", "<p>three</p>"]);
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn test_heading_and_signature_outside_page_survive() {
        let html = r#"<h1>AFFIDAVIT</h1><div class="page"><p>body</p></div><p>Signature</p>"#;
        let pages = paginator(&[100.0, 100.0, 100.0]).paginate(html, Measurement::inches(8.5));
        assert_eq!(pages.len(), 1);
        for text in ["AFFIDAVIT", "body", "Signature"] {
            assert!(pages[0].contains(text));
        }
    }

    #[test]
    fn test_stylesheet_heights_drive_page_breaks() {
        let by_class = r#"<style>.tall { height: 900px }</style><div class="page"><div class="tall">a</div><div class="tall">b</div></div>"#;
        let inline = r#"<div class="page"><div style="height: 900px">a</div><div style="height: 900px">b</div></div>"#;
        assert_eq!(Paginator::default().paginate(by_class, Measurement::inches(8.5)).len(), 2);
        assert_eq!(Paginator::default().paginate(inline, Measurement::inches(8.5)).len(), 2);
    }

    #[test]
    fn test_page_padding_rule_not_counted_per_block() {
        let blocks: String = (0..4).map(|i| format!("<p>Line {}</p>", i)).collect();
        let html = format!(
            r#"<style>.page {{ padding: 0.5in; min-height: 11in }}</style><div class="page">{}</div>"#,
            blocks
        );
        assert_eq!(Paginator::default().paginate(&html, Measurement::inches(8.5)).len(), 1);
    }
}
