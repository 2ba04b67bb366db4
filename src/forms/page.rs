//! Page records: field validation and the save rules that keep routing
//! consistent with the question being asked.

use crate::core::error::{FormsError, ValidationErrors};
use crate::core::time;
use crate::forms::graph::FormGraph;
use crate::forms::markdown::MarkdownValidator;
use crate::forms::model::{self, AnswerType, Condition, Page, blank_to_none, present};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const QUESTION_TEXT_MAX_LENGTH: usize = 250;
pub const HINT_TEXT_MAX_LENGTH: usize = 500;
pub const PAGE_HEADING_MAX_LENGTH: usize = 250;

const UNSUPPORTED_MARKDOWN_MESSAGE: &str = "can only contain formatting for links, subheadings(##), bulleted listed (*), or numbered lists(1.)";

/// The full editable state of a page, as submitted by the author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageFields {
    pub question_text: String,
    pub hint_text: Option<String>,
    /// Raw answer type; checked against the fixed list on save.
    pub answer_type: String,
    pub answer_settings: Option<JsonValue>,
    #[serde(default)]
    pub is_optional: bool,
    pub page_heading: Option<String>,
    pub guidance_markdown: Option<String>,
}

impl From<&Page> for PageFields {
    fn from(page: &Page) -> Self {
        PageFields {
            question_text: page.question_text.clone(),
            hint_text: page.hint_text.clone(),
            answer_type: page.answer_type.as_str().to_string(),
            answer_settings: page.answer_settings.clone(),
            is_optional: page.is_optional,
            page_heading: page.page_heading.clone(),
            guidance_markdown: page.guidance_markdown.clone(),
        }
    }
}

fn too_long(count: usize) -> String {
    format!("is too long (maximum is {} characters)", count)
}

fn longer_than(value: &Option<String>, max: usize) -> bool {
    value.as_deref().is_some_and(|s| s.chars().count() > max)
}

/// Check every field rule. All rules run; failures accumulate.
pub fn validate_page_fields(
    fields: &PageFields,
    markdown: &dyn MarkdownValidator,
) -> Result<AnswerType, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if fields.question_text.trim().is_empty() {
        errors.add("question_text", "can't be blank");
    } else if fields.question_text.chars().count() > QUESTION_TEXT_MAX_LENGTH {
        errors.add("question_text", too_long(QUESTION_TEXT_MAX_LENGTH));
    }

    if longer_than(&fields.hint_text, HINT_TEXT_MAX_LENGTH) {
        errors.add("hint_text", too_long(HINT_TEXT_MAX_LENGTH));
    }

    let answer_type = if fields.answer_type.trim().is_empty() {
        errors.add("answer_type", "can't be blank");
        None
    } else {
        match fields.answer_type.parse::<AnswerType>() {
            Ok(t) => Some(t),
            Err(_) => {
                errors.add("answer_type", "is not included in the list");
                None
            }
        }
    };

    let heading = present(&fields.page_heading);
    let guidance = present(&fields.guidance_markdown);
    if heading && !guidance {
        errors.add("guidance_markdown", "must be present when Page Heading is present");
    } else if guidance && !heading {
        errors.add("page_heading", "must be present when Guidance Markdown is present");
    }

    if longer_than(&fields.page_heading, PAGE_HEADING_MAX_LENGTH) {
        errors.add("page_heading", too_long(PAGE_HEADING_MAX_LENGTH));
    }

    if let Some(text) = fields.guidance_markdown.as_deref().filter(|s| !s.trim().is_empty()) {
        let validation = markdown.validate(text);
        if validation.too_long() {
            errors.add("guidance_markdown", too_long(markdown.max_length()));
        }
        if validation.has_unsupported_syntax() {
            errors.add("guidance_markdown", UNSUPPORTED_MARKDOWN_MESSAGE);
        }
    }

    match answer_type {
        Some(t) if errors.is_empty() => Ok(t),
        _ => Err(errors),
    }
}

/// Outcome of a successful create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSave {
    pub page: Page,
    pub created: bool,
    /// False when the submitted fields matched what was stored.
    pub changed: bool,
    /// Conditions purged because their option values no longer apply.
    pub destroyed_conditions: Vec<Condition>,
}

fn answer_type_changed_from_selection(before: &Page, after: &Page) -> bool {
    before.answer_type == AnswerType::Selection && after.answer_type != AnswerType::Selection
}

fn answer_settings_changed_from_only_one_option(before: &Page, after: &Page) -> bool {
    before.only_one_option() && !model::only_one_option(after.answer_settings.as_ref())
}

fn apply_fields(page: &mut Page, fields: PageFields, answer_type: AnswerType) {
    page.question_text = fields.question_text;
    page.hint_text = blank_to_none(fields.hint_text);
    page.answer_type = answer_type;
    page.answer_settings = fields.answer_settings;
    page.is_optional = fields.is_optional;
    page.page_heading = blank_to_none(fields.page_heading);
    page.guidance_markdown = blank_to_none(fields.guidance_markdown);
}

impl FormGraph {
    /// Validate and append a new page at the end of the form.
    pub fn create_page(
        &mut self,
        fields: PageFields,
        markdown: &dyn MarkdownValidator,
    ) -> Result<PageSave, ValidationErrors> {
        let answer_type = validate_page_fields(&fields, markdown)?;

        let mut page = Page {
            id: time::new_id("P"),
            form_id: self.form.id.clone(),
            position: 0,
            question_text: String::new(),
            hint_text: None,
            answer_type,
            answer_settings: None,
            is_optional: false,
            page_heading: None,
            guidance_markdown: None,
        };
        apply_fields(&mut page, fields, answer_type);
        let page = self.pages.insert_at_end(page).clone();
        self.form.question_section_completed = false;

        Ok(PageSave {
            page,
            created: true,
            changed: true,
            destroyed_conditions: Vec::new(),
        })
    }

    /// Validate and apply new fields to an existing page.
    ///
    /// A save that changes nothing is a no-op. A real change reopens the pages
    /// section, and purges the page's conditions when it stops being a
    /// selection question or stops being single-choice.
    pub fn save_page(
        &mut self,
        page_id: &str,
        fields: PageFields,
        markdown: &dyn MarkdownValidator,
    ) -> Result<PageSave, FormsError> {
        let before = self
            .pages
            .get(page_id)
            .cloned()
            .ok_or_else(|| FormsError::NotFound(format!("page {}", page_id)))?;
        let answer_type = validate_page_fields(&fields, markdown)?;

        let mut after = before.clone();
        apply_fields(&mut after, fields, answer_type);

        if after == before {
            return Ok(PageSave {
                page: before,
                created: false,
                changed: false,
                destroyed_conditions: Vec::new(),
            });
        }

        let purge = answer_type_changed_from_selection(&before, &after)
            || answer_settings_changed_from_only_one_option(&before, &after);

        if let Some(page) = self.pages.get_mut(page_id) {
            *page = after.clone();
        }
        self.form.question_section_completed = false;

        let destroyed_conditions = if purge {
            self.conditions.remove_conditions_for_check_page(page_id)
        } else {
            Vec::new()
        };

        Ok(PageSave {
            page: after,
            created: false,
            changed: true,
            destroyed_conditions,
        })
    }
}
