//! Page-break planning over measured blocks
//!
//! Pure function of block heights and flags, so the break rules can be
//! tested without any HTML.

use std::ops::Range;

/// What the planner needs to know about one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockMetrics {
    pub height: f64,
    pub keep_together: bool,
}

impl BlockMetrics {
    pub fn new(height: f64, keep_together: bool) -> Self {
        Self {
            height,
            keep_together,
        }
    }
}

#[derive(Default)]
struct Fold {
    pages: Vec<Range<usize>>,
    start: usize,
    filled: f64,
}

impl Fold {
    fn flush(mut self, end: usize) -> Self {
        if end > self.start {
            self.pages.push(self.start..end);
        }
        self.start = end;
        self.filled = 0.0;
        self
    }
}

/// Group blocks into pages, returned as index ranges in document order
///
/// - A block that would overflow a page already holding content starts a
///   new page.
/// - A block that is not keep-together and fills the page to or past the
///   usable height closes the page behind it.
/// - A block taller than a page sits alone on its page.
pub fn plan_pages(blocks: &[BlockMetrics], usable_height: f64) -> Vec<Range<usize>> {
    let fold = blocks
        .iter()
        .enumerate()
        .fold(Fold::default(), |mut fold, (i, block)| {
            if i > fold.start && fold.filled + block.height > usable_height {
                fold = fold.flush(i);
            }
            fold.filled += block.height;
            if !block.keep_together && fold.filled >= usable_height {
                fold = fold.flush(i + 1);
            }
            fold
        });
    fold.flush(blocks.len()).pages
}
