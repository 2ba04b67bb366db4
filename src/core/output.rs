//! Terminal rendering helpers for CLI surfaces.
//!
//! JSON goes to stdout untouched; these helpers produce the human-readable
//! variants (task lists, field errors) and keep them bounded.

use crate::core::error::ValidationErrors;
use crate::forms::status::{MissingSection, Section, TaskStatus, TaskStatuses};
use colored::{ColoredString, Colorize};

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

/// Render up to `max_items` messages joined by ` | `.
pub fn preview_messages(messages: &[String], max_items: usize, max_chars: usize) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let shown = messages
        .iter()
        .take(max_items)
        .map(|m| compact_line(m, max_chars))
        .collect::<Vec<_>>()
        .join(" | ");
    if messages.len() > max_items {
        format!("{} (+{} more)", shown, messages.len() - max_items)
    } else {
        shown
    }
}

pub fn status_badge(status: TaskStatus) -> ColoredString {
    let label = status.as_str().replace('_', " ");
    match status {
        TaskStatus::Completed => label.bright_green().bold(),
        TaskStatus::InProgress => label.bright_yellow(),
        TaskStatus::NotStarted => label.bright_blue(),
        TaskStatus::CannotStart => label.bright_black(),
    }
}

fn status_for(statuses: &TaskStatuses, section: Section) -> TaskStatus {
    match section {
        Section::Name => statuses.name_status,
        Section::Pages => statuses.pages_status,
        Section::Declaration => statuses.declaration_status,
        Section::WhatHappensNext => statuses.what_happens_next_status,
        Section::PrivacyPolicy => statuses.privacy_policy_status,
        Section::SupportContactDetails => statuses.support_contact_details_status,
        Section::MakeLive => statuses.make_live_status,
    }
}

/// One line per section, then what is still blocking publication.
pub fn render_task_list(
    form_name: &str,
    statuses: &TaskStatuses,
    missing: &[MissingSection],
) -> String {
    let mut out = format!("{}\n", compact_line(form_name, 60).bright_white().bold());
    for section in Section::ALL {
        out.push_str(&format!(
            "  {:<26} {}\n",
            section.as_str().replace('_', " "),
            status_badge(status_for(statuses, *section))
        ));
    }
    if !missing.is_empty() {
        let tags: Vec<String> = missing.iter().map(|m| m.as_str().to_string()).collect();
        out.push_str(&format!(
            "  {} {}\n",
            "missing:".bright_red(),
            preview_messages(&tags, tags.len(), 40)
        ));
    }
    out
}

/// `field: message | message` lines for a failed save.
pub fn render_validation_errors(errors: &ValidationErrors) -> String {
    errors
        .fields()
        .map(|field| {
            format!(
                "  {} {}",
                format!("{}:", field).bright_red(),
                preview_messages(errors.messages(field), 3, 120)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
