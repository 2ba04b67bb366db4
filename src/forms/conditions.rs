//! Conditional routing edges between pages.
//!
//! Conditions reference pages by id, never by position, so reordering cannot
//! break a condition's target, only its direction. Direction and dangling
//! references are checked on every read against the current `PageOrder`;
//! nothing here is cached.

use crate::core::error::FormsError;
use crate::core::time;
use crate::forms::model::{Condition, RouteTarget};
use crate::forms::page_order::PageOrder;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingErrorKind {
    RoutingPageDoesntExist,
    GotoPageDoesntExist,
    CannotHaveGotoPageBeforeRoutingPage,
}

impl RoutingErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutingErrorKind::RoutingPageDoesntExist => "routing_page_doesnt_exist",
            RoutingErrorKind::GotoPageDoesntExist => "goto_page_doesnt_exist",
            RoutingErrorKind::CannotHaveGotoPageBeforeRoutingPage => {
                "cannot_have_goto_page_before_routing_page"
            }
        }
    }
}

impl fmt::Display for RoutingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingError {
    pub condition_id: String,
    pub kind: RoutingErrorKind,
}

/// Structural problems with one condition against the current page order.
pub fn validation_errors(condition: &Condition, pages: &PageOrder) -> Vec<RoutingErrorKind> {
    let mut errors = Vec::new();

    let routing_exists = condition
        .routing_page_id
        .as_deref()
        .is_some_and(|id| pages.contains(id));
    if !routing_exists {
        errors.push(RoutingErrorKind::RoutingPageDoesntExist);
    }

    if condition.skip_to_end {
        return errors;
    }

    match condition.goto_page_id.as_deref().and_then(|id| pages.position_of(id)) {
        None => errors.push(RoutingErrorKind::GotoPageDoesntExist),
        Some(goto_position) => {
            if let Some(check_position) = pages.position_of(&condition.check_page_id) {
                if goto_position <= check_position {
                    errors.push(RoutingErrorKind::CannotHaveGotoPageBeforeRoutingPage);
                }
            }
        }
    }

    errors
}

/// What happened to conditions when a page disappeared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetachedConditions {
    /// Conditions whose check page was the deleted page.
    pub destroyed: Vec<Condition>,
    /// Ids of conditions that lost a routing or goto reference.
    pub nulled: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionGraph {
    conditions: Vec<Condition>,
}

impl ConditionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_conditions(conditions: Vec<Condition>) -> Self {
        ConditionGraph { conditions }
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn get(&self, condition_id: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.id == condition_id)
    }

    /// Conditions whose check page is `page_id`.
    pub fn outgoing<'a>(&'a self, page_id: &'a str) -> impl Iterator<Item = &'a Condition> + 'a {
        self.conditions
            .iter()
            .filter(move |c| c.check_page_id == page_id)
    }

    /// Add a rule on `check_page_id`. Both pages must exist now; direction is
    /// not enforced here and surfaces later as a routing error.
    pub fn add_condition(
        &mut self,
        pages: &PageOrder,
        check_page_id: &str,
        answer_value: &str,
        target: RouteTarget,
    ) -> Result<&Condition, FormsError> {
        let check_page = pages
            .get(check_page_id)
            .ok_or_else(|| FormsError::NotFound(format!("check page {}", check_page_id)))?;
        ensure_target_exists(pages, &target)?;
        if answer_value.trim().is_empty() {
            return Err(FormsError::ValidationError(
                "answer_value can't be blank".to_string(),
            ));
        }

        let mut condition = Condition {
            id: time::new_id("C"),
            form_id: check_page.form_id.clone(),
            check_page_id: check_page.id.clone(),
            routing_page_id: Some(check_page.id.clone()),
            goto_page_id: None,
            answer_value: answer_value.to_string(),
            skip_to_end: false,
        };
        condition.set_target(target);
        self.conditions.push(condition);
        Ok(&self.conditions[self.conditions.len() - 1])
    }

    /// Change the answer value and/or target. The check page is fixed.
    pub fn update_condition(
        &mut self,
        pages: &PageOrder,
        condition_id: &str,
        answer_value: Option<&str>,
        target: Option<RouteTarget>,
    ) -> Result<&Condition, FormsError> {
        if let Some(target) = &target {
            ensure_target_exists(pages, target)?;
        }
        if answer_value.is_some_and(|v| v.trim().is_empty()) {
            return Err(FormsError::ValidationError(
                "answer_value can't be blank".to_string(),
            ));
        }

        let condition = self
            .conditions
            .iter_mut()
            .find(|c| c.id == condition_id)
            .ok_or_else(|| FormsError::NotFound(format!("condition {}", condition_id)))?;
        if let Some(value) = answer_value {
            condition.answer_value = value.to_string();
        }
        if let Some(target) = target {
            condition.set_target(target);
        }
        Ok(condition)
    }

    pub fn remove_condition(&mut self, condition_id: &str) -> Result<Condition, FormsError> {
        let index = self
            .conditions
            .iter()
            .position(|c| c.id == condition_id)
            .ok_or_else(|| FormsError::NotFound(format!("condition {}", condition_id)))?;
        Ok(self.conditions.remove(index))
    }

    pub fn remove_conditions_for_check_page(&mut self, page_id: &str) -> Vec<Condition> {
        let (removed, kept): (Vec<Condition>, Vec<Condition>) = std::mem::take(&mut self.conditions)
            .into_iter()
            .partition(|c| c.check_page_id == page_id);
        self.conditions = kept;
        removed
    }

    /// Apply page deletion: destroy conditions checked on the page, clear
    /// routing/goto references to it on the rest.
    pub fn detach_page(&mut self, page_id: &str) -> DetachedConditions {
        let destroyed = self.remove_conditions_for_check_page(page_id);
        let mut nulled = Vec::new();
        for condition in &mut self.conditions {
            let mut touched = false;
            if condition.routing_page_id.as_deref() == Some(page_id) {
                condition.routing_page_id = None;
                touched = true;
            }
            if condition.goto_page_id.as_deref() == Some(page_id) {
                condition.goto_page_id = None;
                touched = true;
            }
            if touched {
                nulled.push(condition.id.clone());
            }
        }
        DetachedConditions { destroyed, nulled }
    }

    /// Routing errors over the outgoing conditions of `page_id`, evaluated now.
    pub fn routing_errors_for(&self, page_id: &str, pages: &PageOrder) -> Vec<RoutingError> {
        self.outgoing(page_id)
            .flat_map(|condition| {
                validation_errors(condition, pages)
                    .into_iter()
                    .map(move |kind| RoutingError {
                        condition_id: condition.id.clone(),
                        kind,
                    })
            })
            .collect()
    }

    pub fn has_routing_errors(&self, page_id: &str, pages: &PageOrder) -> bool {
        self.outgoing(page_id)
            .any(|condition| !validation_errors(condition, pages).is_empty())
    }

    pub fn any_routing_errors(&self, pages: &PageOrder) -> bool {
        self.conditions
            .iter()
            .any(|condition| !validation_errors(condition, pages).is_empty())
    }
}

fn ensure_target_exists(pages: &PageOrder, target: &RouteTarget) -> Result<(), FormsError> {
    match target {
        RouteTarget::Page(id) if !pages.contains(id) => {
            Err(FormsError::NotFound(format!("goto page {}", id)))
        }
        _ => Ok(()),
    }
}
