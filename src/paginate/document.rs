//! Reading a resolved document into pages and writing fragments back out

use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;

use super::css::{self, Stylesheet};
use super::measure::{element_tag, Measurement};
use super::PaginateError;

fn attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|el| el.attributes.borrow().get(name).map(str::to_string))
}

fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(element_tag)
}

fn has_class(node: &NodeRef, class: &str) -> bool {
    attr(node, "class")
        .map(|classes| classes.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

fn is_inside(node: &NodeRef, ancestor: &NodeRef) -> bool {
    node.ancestors().any(|a| a == *ancestor)
}

fn element_children(node: &NodeRef) -> impl Iterator<Item = NodeRef> {
    node.children().filter(|child| child.as_element().is_some())
}

fn is_metadata(node: &NodeRef) -> bool {
    matches!(
        tag_name(node).as_deref(),
        Some("style" | "script" | "link" | "meta" | "template" | "title")
    )
}

fn is_blank_text(node: &NodeRef) -> bool {
    node.as_text()
        .map(|t| t.borrow().trim().is_empty())
        .unwrap_or(false)
}

/// One block of the content container
#[derive(Debug, Clone)]
pub struct Block {
    pub html: String,
    pub keep_together: bool,
}

impl Block {
    fn new(node: &NodeRef, sheet: &Stylesheet) -> Self {
        Self {
            keep_together: keep_together(node, sheet),
            html: node.to_string(),
        }
    }
}

/// What a document looks like to the paginator
#[derive(Debug)]
pub enum Layout {
    /// Several sibling page units written by the template author
    PrePaginated(Vec<String>),
    /// One content container whose children get distributed over pages
    Flowing(Vec<Block>),
}

/// A parsed resolved document
#[derive(Debug)]
pub struct SourceDocument {
    styles: String,
    parent_class: Option<String>,
    page_class: String,
    page_style: String,
    layout: Layout,
}

impl SourceDocument {
    pub fn parse(html: &str, page_class: &str) -> Result<Self, PaginateError> {
        let document = kuchiki::parse_html().one(html);
        let body = document
            .select_first("body")
            .map_err(|_| PaginateError::NoContainer)?
            .as_node()
            .clone();
        let sheet = Stylesheet::parse(&stylesheet_text(&document));

        if let Some(pages) = sibling_pages(&document, page_class) {
            if has_stray_content(&body, &pages) {
                tracing::debug!("Content outside the page units, paginating the body instead");
                return Ok(Self::from_body(&document, &body, page_class, &sheet));
            }
            let parent = pages[0].parent();
            let styles = preserved_styles(&document, &pages);
            return Ok(Self {
                styles,
                parent_class: parent.as_ref().and_then(|p| wrapper_class(p)),
                page_class: page_class.to_string(),
                page_style: String::new(),
                layout: Layout::PrePaginated(pages.iter().map(NodeRef::to_string).collect()),
            });
        }

        let container = find_container(&body, page_class).ok_or(PaginateError::NoContainer)?;
        if has_stray_content(&body, std::slice::from_ref(&container)) {
            tracing::debug!("Content outside the container, paginating the body instead");
            return Ok(Self::from_body(&document, &body, page_class, &sheet));
        }

        let styles = preserved_styles(&document, std::slice::from_ref(&container));
        let blocks = container
            .children()
            .filter(|child| match child.as_element() {
                Some(_) => true,
                None => child.as_text().is_some() && !is_blank_text(child),
            })
            .map(|child| Block::new(&child, &sheet))
            .collect();

        Ok(Self {
            styles,
            parent_class: container.parent().and_then(|p| wrapper_class(&p)),
            page_class: attr(&container, "class").unwrap_or_else(|| page_class.to_string()),
            page_style: attr(&container, "style").unwrap_or_default(),
            layout: Layout::Flowing(blocks),
        })
    }

    /// Every top-level body node is a block; stylesheets stay in the preamble
    fn from_body(document: &NodeRef, body: &NodeRef, page_class: &str, sheet: &Stylesheet) -> Self {
        let blocks = body
            .children()
            .filter(|child| match child.as_element() {
                Some(_) => !is_metadata(child),
                None => child.as_text().is_some() && !is_blank_text(child),
            })
            .map(|child| Block::new(&child, sheet))
            .collect();
        Self {
            styles: preserved_styles(document, &[]),
            parent_class: None,
            page_class: page_class.to_string(),
            page_style: String::new(),
            layout: Layout::Flowing(blocks),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn styles(&self) -> &str {
        &self.styles
    }

    /// Page style with a width added when the container had none
    pub fn page_style(&self, width: Measurement) -> String {
        if css::declaration(&self.page_style, "width").is_some() {
            return self.page_style.clone();
        }
        let base = self.page_style.trim().trim_end_matches(';');
        if base.is_empty() {
            format!("width: {}", width)
        } else {
            format!("{}; width: {}", base, width)
        }
    }

    /// Width left for blocks once the container's horizontal padding is taken off
    pub fn content_width(&self, width: Measurement) -> Measurement {
        let mut padding = 0.0;
        for (name, value) in css::declarations(&self.page_style) {
            let px = |v: &str| Measurement::parse(v).map(Measurement::to_px).unwrap_or(0.0);
            match name.as_str() {
                "padding-left" | "padding-right" => padding += px(&value),
                "padding" => {
                    let parts: Vec<f64> = value.split_whitespace().map(px).collect();
                    padding = match parts.as_slice() {
                        [all] => all * 2.0,
                        [_, horizontal] | [_, horizontal, _] => horizontal * 2.0,
                        [_, right, _, left] => right + left,
                        _ => padding,
                    };
                }
                _ => {}
            }
        }
        let own = css::declaration(&self.page_style, "width")
            .and_then(|w| Measurement::parse(&w))
            .unwrap_or(width);
        Measurement::px((own.to_px() - padding).max(1.0))
    }

    fn wrap(&self, page: String) -> String {
        match &self.parent_class {
            Some(class) => format!(r#"{}<div class="{}">{}</div>"#, self.styles, class, page),
            None => format!("{}{}", self.styles, page),
        }
    }

    /// Markup used to measure one block in its class chain
    ///
    /// The wrappers are `display: contents` so only the block's own box is measured.
    pub fn measurement_markup(&self, block: &Block) -> String {
        let inner = format!(
            r#"<div class="{}" style="display: contents">{}</div>"#,
            self.page_class, block.html
        );
        match &self.parent_class {
            Some(class) => format!(r#"<div class="{}" style="display: contents">{}</div>"#, class, inner),
            None => inner,
        }
    }

    /// A self-contained fragment holding `blocks`
    pub fn fragment(&self, blocks: &[Block], width: Measurement) -> String {
        let content: String = blocks.iter().map(|b| b.html.as_str()).collect();
        self.wrap(format!(
            r#"<div class="{}" style="{}">{}</div>"#,
            self.page_class,
            self.page_style(width),
            content
        ))
    }

    /// Pre-paginated units, each wrapped and prefixed with the shared styles
    pub fn page_fragments(&self) -> Vec<String> {
        match &self.layout {
            Layout::PrePaginated(pages) => pages.iter().map(|p| self.wrap(p.clone())).collect(),
            Layout::Flowing(_) => Vec::new(),
        }
    }
}

/// More than one `.page` element under the same parent
fn sibling_pages(document: &NodeRef, page_class: &str) -> Option<Vec<NodeRef>> {
    let first = document
        .select(&format!(".{}", page_class))
        .ok()?
        .next()?
        .as_node()
        .clone();
    let parent = first.parent()?;
    let pages: Vec<NodeRef> = element_children(&parent)
        .filter(|child| has_class(child, page_class))
        .collect();
    (pages.len() > 1).then_some(pages)
}

/// First `.page`, else the first element sized by a width style, else the first top-level element
fn find_container(body: &NodeRef, page_class: &str) -> Option<NodeRef> {
    let elements = || {
        body.descendants()
            .filter(|n| n.as_element().is_some())
    };
    elements()
        .find(|n| has_class(n, page_class))
        .or_else(|| {
            elements().find(|n| {
                attr(n, "style")
                    .map(|s| css::declaration(&s, "width").is_some())
                    .unwrap_or(false)
            })
        })
        .or_else(|| element_children(body).find(|n| !is_metadata(n)))
}

/// Body content that is neither inside one of `containers` nor one of their ancestors
fn has_stray_content(body: &NodeRef, containers: &[NodeRef]) -> bool {
    body.descendants().any(|node| {
        if containers.iter().any(|c| node == *c || is_inside(&node, c) || is_inside(c, &node)) {
            return false;
        }
        if node.ancestors().any(|a| is_metadata(&a)) {
            return false;
        }
        match node.as_element() {
            Some(_) => !is_metadata(&node),
            None => node.as_text().is_some() && !is_blank_text(&node),
        }
    })
}

/// Class of the container's parent, unless that parent is the document body
fn wrapper_class(parent: &NodeRef) -> Option<String> {
    match tag_name(parent).as_deref() {
        Some("body" | "html") | None => None,
        Some(_) => attr(parent, "class").filter(|c| !c.trim().is_empty()),
    }
}

fn outside_all(node: &NodeRef, containers: &[NodeRef]) -> bool {
    !containers.iter().any(|c| is_inside(node, c))
}

/// Serialized `<style>` elements that sit outside the content
fn preserved_styles(document: &NodeRef, containers: &[NodeRef]) -> String {
    match document.select("style") {
        Ok(styles) => styles
            .map(|s| s.as_node().clone())
            .filter(|s| outside_all(s, containers))
            .map(|s| s.to_string())
            .collect(),
        Err(_) => String::new(),
    }
}

/// Text of every stylesheet in the document
fn stylesheet_text(document: &NodeRef) -> String {
    match document.select("style") {
        Ok(styles) => styles.map(|s| s.text_contents()).collect::<Vec<_>>().join("\n"),
        Err(_) => String::new(),
    }
}

fn keep_together(node: &NodeRef, sheet: &Stylesheet) -> bool {
    let Some(tag) = tag_name(node) else {
        return false;
    };
    let inline = attr(node, "style")
        .map(|s| css::avoids_break_inside(&s))
        .unwrap_or(false);
    inline || sheet.keeps_together(&tag, attr(node, "class").as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(doc: &SourceDocument) -> &[Block] {
        match doc.layout() {
            Layout::Flowing(blocks) => blocks,
            Layout::PrePaginated(_) => panic!("expected a flowing layout"),
        }
    }

    #[test]
    fn test_container_is_first_page() {
        let doc = SourceDocument::parse(
            r#"<style>.x{}</style><div class="affidavit"><div class="page" style="padding: 0.5in"><p>A</p><p>B</p></div></div>"#,
            "page",
        )
        .unwrap();
        assert_eq!(blocks(&doc).len(), 2);
        assert_eq!(blocks(&doc)[0].html, "<p>A</p>");
        assert_eq!(doc.styles(), "<style>.x{}</style>");
        assert_eq!(
            doc.fragment(&blocks(&doc)[1..], Measurement::inches(8.5)),
            r#"<style>.x{}</style><div class="affidavit"><div class="page" style="padding: 0.5in; width: 816px"><p>B</p></div></div>"#
        );
        assert_eq!(doc.content_width(Measurement::inches(8.5)), Measurement::px(720.0));
    }

    #[test]
    fn test_container_by_width_style() {
        let doc = SourceDocument::parse(
            r#"<div><section style="width: 8.5in"><h1>T</h1><p>x</p></section></div>"#,
            "page",
        )
        .unwrap();
        assert_eq!(blocks(&doc).len(), 2);
        assert_eq!(doc.page_style(Measurement::px(100.0)), "width: 8.5in");
        assert_eq!(doc.page_class, "page");
    }

    #[test]
    fn test_container_falls_back_to_first_element() {
        let doc = SourceDocument::parse("<article><p>1</p><p>2</p><p>3</p></article>", "page").unwrap();
        assert_eq!(blocks(&doc).len(), 3);
        assert!(doc.parent_class.is_none());
    }

    #[test]
    fn test_keep_together_flags() {
        let doc = SourceDocument::parse(
            r#"<style>.sig { page-break-inside: avoid }</style>
               <div class="page">
                 <p>plain</p>
                 <div class="sig">signature</div>
                 <table style="break-inside: avoid"><tr><td>x</td></tr></table>
               </div>"#,
            "page",
        )
        .unwrap();
        let flags: Vec<bool> = blocks(&doc).iter().map(|b| b.keep_together).collect();
        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn test_pre_paginated_detection() {
        let doc = SourceDocument::parse(
            r#"<style>p{}</style><div class="doc"><div class="page">One</div><div class="page">Two</div></div>"#,
            "page",
        )
        .unwrap();
        assert_eq!(
            doc.page_fragments(),
            vec![
                r#"<style>p{}</style><div class="doc"><div class="page">One</div></div>"#.to_string(),
                r#"<style>p{}</style><div class="doc"><div class="page">Two</div></div>"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_single_page_is_not_pre_paginated() {
        let doc = SourceDocument::parse(r#"<div class="page"><p>only</p></div>"#, "page").unwrap();
        assert!(matches!(doc.layout(), Layout::Flowing(_)));
    }

    #[test]
    fn test_empty_document_has_no_container() {
        assert!(matches!(
            SourceDocument::parse("", "page"),
            Err(PaginateError::NoContainer)
        ));
    }

    #[test]
    fn test_top_level_siblings_become_blocks() {
        let doc = SourceDocument::parse("<p>one</p><p>two</p><p>three</p>", "page").unwrap();
        let html: Vec<&str> = blocks(&doc).iter().map(|b| b.html.as_str()).collect();
        assert_eq!(html, vec!["<p>one</p>", "<p>two</p>", "<p>three</p>"]);
        assert_eq!(doc.page_class, "page");
        assert!(doc.page_style.is_empty());
    }

    #[test]
    fn test_content_around_page_is_kept() {
        let doc = SourceDocument::parse(
            r#"<style>h1{}</style><h1>AFFIDAVIT</h1><div class="page"><p>body</p></div><p>Signature</p>"#,
            "page",
        )
        .unwrap();
        let html: Vec<&str> = blocks(&doc).iter().map(|b| b.html.as_str()).collect();
        assert_eq!(
            html,
            vec![
                "<h1>AFFIDAVIT</h1>",
                r#"<div class="page"><p>body</p></div>"#,
                "<p>Signature</p>",
            ]
        );
        assert_eq!(doc.styles(), "<style>h1{}</style>");
    }

    #[test]
    fn test_text_beside_pages_disables_passthrough() {
        let doc = SourceDocument::parse(
            r#"<div class="page">One</div><div class="page">Two</div>Sworn before me"#,
            "page",
        )
        .unwrap();
        assert_eq!(blocks(&doc).len(), 3);
        assert_eq!(blocks(&doc)[2].html, "Sworn before me");
    }

    #[test]
    fn test_wrapper_ancestors_are_not_stray() {
        let doc = SourceDocument::parse(
            r#"<div class="affidavit">  <div class="page"><p>A</p></div>  </div>"#,
            "page",
        )
        .unwrap();
        assert_eq!(blocks(&doc).len(), 1);
        assert_eq!(doc.parent_class.as_deref(), Some("affidavit"));
    }
}
