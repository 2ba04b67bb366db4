//! Ordered page sequence for one form.
//!
//! Pages are held in a plain vector whose index order is the sequence order.
//! After every mutation `renumber` rewrites `position = index + 1`, so positions
//! stay dense, 1-based and duplicate-free without relying on any storage-side
//! ordering.

use crate::core::error::FormsError;
use crate::forms::model::Page;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageOrder {
    pages: Vec<Page>,
}

impl PageOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored pages. Sorts by stored position and repairs gaps.
    pub fn from_pages(mut pages: Vec<Page>) -> Self {
        pages.sort_by_key(|p| p.position);
        let mut order = PageOrder { pages };
        order.renumber();
        order
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    pub fn get(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    pub fn get_mut(&mut self, page_id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == page_id)
    }

    pub fn contains(&self, page_id: &str) -> bool {
        self.get(page_id).is_some()
    }

    pub fn position_of(&self, page_id: &str) -> Option<u32> {
        self.get(page_id).map(|p| p.position)
    }

    fn index_of(&self, page_id: &str) -> Result<usize, FormsError> {
        self.pages
            .iter()
            .position(|p| p.id == page_id)
            .ok_or_else(|| FormsError::NotFound(format!("page {}", page_id)))
    }

    /// Append `page` as the last in sequence. Its stored position is ignored.
    pub fn insert_at_end(&mut self, mut page: Page) -> &Page {
        page.position = self.pages.len() as u32 + 1;
        self.pages.push(page);
        &self.pages[self.pages.len() - 1]
    }

    /// Move a page to `new_position` (1-based), shifting the pages in between by one.
    ///
    /// Returns the ids of every page whose position changed, in new order.
    pub fn move_to(&mut self, page_id: &str, new_position: u32) -> Result<Vec<String>, FormsError> {
        let len = self.pages.len() as u32;
        if new_position == 0 || new_position > len {
            return Err(FormsError::ValidationError(format!(
                "position {} is out of range 1..={}",
                new_position, len
            )));
        }

        let from = self.index_of(page_id)?;
        let to = (new_position - 1) as usize;
        if from == to {
            return Ok(Vec::new());
        }

        let page = self.pages.remove(from);
        self.pages.insert(to, page);

        let (lo, hi) = (from.min(to), from.max(to));
        self.renumber();
        Ok(self.pages[lo..=hi].iter().map(|p| p.id.clone()).collect())
    }

    /// The id of the page immediately after `page_id`, or `None` if it is last.
    pub fn next_page(&self, page_id: &str) -> Option<&str> {
        let index = self.pages.iter().position(|p| p.id == page_id)?;
        self.pages.get(index + 1).map(|p| p.id.as_str())
    }

    /// Remove a page and compact the positions of everything after it.
    pub fn delete(&mut self, page_id: &str) -> Result<Page, FormsError> {
        let index = self.index_of(page_id)?;
        let removed = self.pages.remove(index);
        self.renumber();
        Ok(removed)
    }

    fn renumber(&mut self) {
        for (index, page) in self.pages.iter_mut().enumerate() {
            page.position = index as u32 + 1;
        }
    }
}
