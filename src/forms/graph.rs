//! A form with its ordered pages and routing conditions, loaded as one unit.

use crate::core::error::FormsError;
use crate::forms::conditions::{ConditionGraph, DetachedConditions};
use crate::forms::model::{Form, Page};
use crate::forms::page_order::PageOrder;

#[derive(Debug, Clone, PartialEq)]
pub struct FormGraph {
    pub form: Form,
    pub pages: PageOrder,
    pub conditions: ConditionGraph,
}

/// Result of deleting a page from a graph.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDeletion {
    pub page: Page,
    pub detached: DetachedConditions,
}

impl FormGraph {
    pub fn new(form: Form) -> Self {
        FormGraph {
            form,
            pages: PageOrder::new(),
            conditions: ConditionGraph::new(),
        }
    }

    /// Move a page; conditions keep their ids so only their direction can change.
    pub fn move_page(&mut self, page_id: &str, new_position: u32) -> Result<Vec<String>, FormsError> {
        let changed = self.pages.move_to(page_id, new_position)?;
        if !changed.is_empty() {
            self.form.question_section_completed = false;
        }
        Ok(changed)
    }

    /// Delete a page, compact positions, destroy conditions checked on it and
    /// null references to it. Reopens the pages section.
    pub fn delete_page(&mut self, page_id: &str) -> Result<PageDeletion, FormsError> {
        let page = self.pages.delete(page_id)?;
        let detached = self.conditions.detach_page(page_id);
        self.form.question_section_completed = false;
        Ok(PageDeletion { page, detached })
    }

    pub fn next_page(&self, page_id: &str) -> Option<&str> {
        self.pages.next_page(page_id)
    }

    pub fn has_routing_errors(&self, page_id: &str) -> bool {
        self.conditions.has_routing_errors(page_id, &self.pages)
    }

    pub fn any_routing_errors(&self) -> bool {
        self.conditions.any_routing_errors(&self.pages)
    }
}
