//! Externalized shapes of pages and forms, with derived routing fields
//! filled in at the moment of serialization.

use crate::forms::conditions::{RoutingErrorKind, validation_errors};
use crate::forms::graph::FormGraph;
use crate::forms::model::{Condition, Form, Page};
use crate::forms::status::{CompletionStatus, MissingSection, TaskStatuses};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionView {
    #[serde(flatten)]
    pub condition: Condition,
    pub validation_errors: Vec<RoutingErrorKind>,
    pub has_routing_errors: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    #[serde(flatten)]
    pub page: Page,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    pub has_routing_errors: bool,
    pub routing_conditions: Vec<ConditionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormView {
    #[serde(flatten)]
    pub form: Form,
    pub pages: Vec<PageView>,
    pub task_statuses: TaskStatuses,
    pub missing_sections: Vec<MissingSection>,
    /// Any page with a routing error. Reported only; does not gate make-live.
    #[serde(default)]
    pub has_routing_errors: bool,
}

impl FormGraph {
    pub fn page_view(&self, page_id: &str) -> Option<PageView> {
        let page = self.pages.get(page_id)?;
        let routing_conditions: Vec<ConditionView> = self
            .conditions
            .outgoing(page_id)
            .map(|condition| {
                let errors = validation_errors(condition, &self.pages);
                ConditionView {
                    condition: condition.clone(),
                    has_routing_errors: !errors.is_empty(),
                    validation_errors: errors,
                }
            })
            .collect();

        Some(PageView {
            page: page.clone(),
            next_page: self.next_page(page_id).map(str::to_string),
            has_routing_errors: routing_conditions.iter().any(|c| c.has_routing_errors),
            routing_conditions,
        })
    }

    pub fn page_views(&self) -> Vec<PageView> {
        self.pages
            .iter()
            .filter_map(|page| self.page_view(&page.id))
            .collect()
    }

    pub fn form_view(&self) -> FormView {
        let status = CompletionStatus::for_graph(self);
        FormView {
            form: self.form.clone(),
            pages: self.page_views(),
            task_statuses: status.task_statuses(),
            missing_sections: status.missing_sections(),
            has_routing_errors: self.any_routing_errors(),
        }
    }
}
