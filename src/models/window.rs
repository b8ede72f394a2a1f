// src/models/window.rs

//! Offset/limit windows over paginated collections.

/// Bounds for a paginated crawl.
///
/// `start` is a 0-based offset into the whole remote collection, `num` the
/// maximum number of entries to return. Both unset means fetch everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlWindow {
    pub start: Option<usize>,
    pub num: Option<usize>,
}

impl CrawlWindow {
    /// Page size assumed by the windowing arithmetic, matching the REST
    /// API's default.
    pub const PER_PAGE: usize = 10;

    pub fn new(start: Option<usize>, num: Option<usize>) -> Self {
        Self { start, num }
    }

    /// A window over the whole collection.
    pub fn everything() -> Self {
        Self::default()
    }

    /// The 1-based page the crawl begins on.
    pub fn first_page(&self) -> usize {
        match self.start {
            Some(start) => start / Self::PER_PAGE + 1,
            None => 1,
        }
    }

    /// Number of leading items to drop from the first in-window page.
    pub fn first_page_offset(&self) -> usize {
        self.start.map_or(0, |start| start % Self::PER_PAGE)
    }

    /// Clamp `start` to the last item once the collection size is known.
    pub fn clamp_start(&mut self, total_entries: usize) {
        if let Some(start) = self.start {
            if total_entries < start {
                self.start = Some(total_entries.saturating_sub(1));
            }
        }
    }
}
