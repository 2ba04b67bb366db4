//! Entity types for forms, pages and routing conditions.

use crate::core::error::FormsError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Ruby-style `present?`: some non-whitespace text.
pub fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Normalize blank input to `None` so absence has one representation.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Number,
    Address,
    Date,
    Email,
    NationalInsuranceNumber,
    PhoneNumber,
    Selection,
    OrganisationName,
    Text,
    Name,
}

impl AnswerType {
    pub const ALL: &'static [AnswerType] = &[
        AnswerType::Number,
        AnswerType::Address,
        AnswerType::Date,
        AnswerType::Email,
        AnswerType::NationalInsuranceNumber,
        AnswerType::PhoneNumber,
        AnswerType::Selection,
        AnswerType::OrganisationName,
        AnswerType::Text,
        AnswerType::Name,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnswerType::Number => "number",
            AnswerType::Address => "address",
            AnswerType::Date => "date",
            AnswerType::Email => "email",
            AnswerType::NationalInsuranceNumber => "national_insurance_number",
            AnswerType::PhoneNumber => "phone_number",
            AnswerType::Selection => "selection",
            AnswerType::OrganisationName => "organisation_name",
            AnswerType::Text => "text",
            AnswerType::Name => "name",
        }
    }
}

impl fmt::Display for AnswerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerType {
    type Err = FormsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnswerType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| FormsError::ValidationError(format!("unknown answer type '{}'", s)))
    }
}

/// Boolean cast matching form-builder settings payloads: `true`, `"true"`, `"1"`, `1`.
fn truthy(value: Option<&JsonValue>) -> bool {
    match value {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => matches!(s.trim(), "true" | "1" | "t" | "yes" | "on"),
        Some(JsonValue::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: String,
    pub name: String,
    pub form_slug: String,
    pub org: Option<String>,
    pub submission_email: Option<String>,
    pub privacy_policy_url: Option<String>,
    pub what_happens_next_text: Option<String>,
    pub support_email: Option<String>,
    pub support_phone: Option<String>,
    pub support_url: Option<String>,
    pub support_url_text: Option<String>,
    pub declaration_text: Option<String>,
    pub question_section_completed: bool,
    pub declaration_section_completed: bool,
    /// Created or changed since the latest live snapshot.
    pub has_draft_version: bool,
    /// At least one live snapshot exists.
    pub has_live_version: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Form {
    pub fn new(id: String, name: String, now: &str) -> Self {
        let form_slug = slugify(&name);
        Form {
            id,
            name,
            form_slug,
            org: None,
            submission_email: None,
            privacy_policy_url: None,
            what_happens_next_text: None,
            support_email: None,
            support_phone: None,
            support_url: None,
            support_url_text: None,
            declaration_text: None,
            question_section_completed: false,
            declaration_section_completed: false,
            has_draft_version: true,
            has_live_version: false,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    pub fn rename(&mut self, name: String) {
        self.form_slug = slugify(&name);
        self.name = name;
    }
}

/// Lowercase, with every run of non-alphanumerics collapsed to one `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub form_id: String,
    /// 1-based, dense within the form.
    pub position: u32,
    pub question_text: String,
    pub hint_text: Option<String>,
    pub answer_type: AnswerType,
    pub answer_settings: Option<JsonValue>,
    pub is_optional: bool,
    pub page_heading: Option<String>,
    pub guidance_markdown: Option<String>,
}

impl Page {
    /// `answer_settings.only_one_option`, cast to a boolean.
    pub fn only_one_option(&self) -> bool {
        only_one_option(self.answer_settings.as_ref())
    }
}

pub fn only_one_option(settings: Option<&JsonValue>) -> bool {
    truthy(settings.and_then(|s| s.get("only_one_option")))
}

/// Where a condition sends the user when its answer matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    Page(String),
    SkipToEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    pub form_id: String,
    /// The page whose answer is compared. Deleting it destroys the condition.
    pub check_page_id: String,
    /// The page at which the route takes place. Cleared if that page is deleted.
    pub routing_page_id: Option<String>,
    /// The page this condition skips forwards to. Cleared if that page is deleted.
    pub goto_page_id: Option<String>,
    pub answer_value: String,
    pub skip_to_end: bool,
}

impl Condition {
    pub fn target(&self) -> Option<RouteTarget> {
        if self.skip_to_end {
            return Some(RouteTarget::SkipToEnd);
        }
        self.goto_page_id.clone().map(RouteTarget::Page)
    }

    pub fn set_target(&mut self, target: RouteTarget) {
        match target {
            RouteTarget::Page(id) => {
                self.goto_page_id = Some(id);
                self.skip_to_end = false;
            }
            RouteTarget::SkipToEnd => {
                self.goto_page_id = None;
                self.skip_to_end = true;
            }
        }
    }
}
