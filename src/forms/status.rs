//! Per-section completion status and the make-live gate.
//!
//! Every status is computed from the form as it is now. Nothing here is
//! stored; callers build a `CompletionStatus` after loading the form and drop
//! it when done.

use crate::forms::graph::FormGraph;
use crate::forms::model::{Form, present};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    CannotStart,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::CannotStart => "cannot_start",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Name,
    Pages,
    Declaration,
    WhatHappensNext,
    PrivacyPolicy,
    SupportContactDetails,
    MakeLive,
}

impl Section {
    pub const ALL: &'static [Section] = &[
        Section::Name,
        Section::Pages,
        Section::Declaration,
        Section::WhatHappensNext,
        Section::PrivacyPolicy,
        Section::SupportContactDetails,
        Section::MakeLive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Name => "name",
            Section::Pages => "pages",
            Section::Declaration => "declaration",
            Section::WhatHappensNext => "what_happens_next",
            Section::PrivacyPolicy => "privacy_policy",
            Section::SupportContactDetails => "support_contact_details",
            Section::MakeLive => "make_live",
        }
    }
}

/// Tag for a mandatory section that is not yet completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSection {
    MissingPages,
    MissingWhatHappensNext,
    MissingPrivacyPolicyUrl,
    MissingContactDetails,
}

impl MissingSection {
    pub fn as_str(self) -> &'static str {
        match self {
            MissingSection::MissingPages => "missing_pages",
            MissingSection::MissingWhatHappensNext => "missing_what_happens_next",
            MissingSection::MissingPrivacyPolicyUrl => "missing_privacy_policy_url",
            MissingSection::MissingContactDetails => "missing_contact_details",
        }
    }
}

impl fmt::Display for MissingSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sections that gate publication, with the tag reported when incomplete.
const MANDATORY: &[(Section, MissingSection)] = &[
    (Section::Pages, MissingSection::MissingPages),
    (Section::WhatHappensNext, MissingSection::MissingWhatHappensNext),
    (Section::PrivacyPolicy, MissingSection::MissingPrivacyPolicyUrl),
    (Section::SupportContactDetails, MissingSection::MissingContactDetails),
];

/// Every section status in one value, for listing a form's task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatuses {
    pub name_status: TaskStatus,
    pub pages_status: TaskStatus,
    pub declaration_status: TaskStatus,
    pub what_happens_next_status: TaskStatus,
    pub privacy_policy_status: TaskStatus,
    pub support_contact_details_status: TaskStatus,
    pub make_live_status: TaskStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionStatus<'a> {
    form: &'a Form,
    page_count: usize,
}

impl<'a> CompletionStatus<'a> {
    pub fn new(form: &'a Form, page_count: usize) -> Self {
        CompletionStatus { form, page_count }
    }

    pub fn for_graph(graph: &'a FormGraph) -> Self {
        Self::new(&graph.form, graph.pages.len())
    }

    pub fn name_status(&self) -> TaskStatus {
        TaskStatus::Completed
    }

    /// Routing errors are reported per page and do not hold this section open.
    pub fn pages_status(&self) -> TaskStatus {
        if self.page_count == 0 {
            TaskStatus::NotStarted
        } else if self.form.question_section_completed {
            TaskStatus::Completed
        } else {
            TaskStatus::InProgress
        }
    }

    pub fn declaration_status(&self) -> TaskStatus {
        if self.form.declaration_section_completed {
            TaskStatus::Completed
        } else if present(&self.form.declaration_text) {
            TaskStatus::InProgress
        } else {
            TaskStatus::NotStarted
        }
    }

    pub fn what_happens_next_status(&self) -> TaskStatus {
        presence_status(present(&self.form.what_happens_next_text))
    }

    pub fn privacy_policy_status(&self) -> TaskStatus {
        presence_status(present(&self.form.privacy_policy_url))
    }

    pub fn support_contact_details_status(&self) -> TaskStatus {
        let form = self.form;
        let url_pair = present(&form.support_url_text) && present(&form.support_url);
        presence_status(present(&form.support_email) || present(&form.support_phone) || url_pair)
    }

    /// Draft beats live. A form with neither reports `not_started`.
    pub fn make_live_status(&self) -> TaskStatus {
        if self.form.has_draft_version {
            if self.mandatory_tasks_completed() {
                TaskStatus::NotStarted
            } else {
                TaskStatus::CannotStart
            }
        } else if self.form.has_live_version {
            TaskStatus::Completed
        } else {
            TaskStatus::NotStarted
        }
    }

    pub fn status_of(&self, section: Section) -> TaskStatus {
        match section {
            Section::Name => self.name_status(),
            Section::Pages => self.pages_status(),
            Section::Declaration => self.declaration_status(),
            Section::WhatHappensNext => self.what_happens_next_status(),
            Section::PrivacyPolicy => self.privacy_policy_status(),
            Section::SupportContactDetails => self.support_contact_details_status(),
            Section::MakeLive => self.make_live_status(),
        }
    }

    pub fn mandatory_tasks_completed(&self) -> bool {
        MANDATORY
            .iter()
            .all(|(section, _)| self.status_of(*section) == TaskStatus::Completed)
    }

    /// True when there is a draft and every mandatory section is complete.
    pub fn can_publish(&self) -> bool {
        self.make_live_status() == TaskStatus::NotStarted && self.form.has_draft_version
    }

    /// Mandatory sections not yet completed, in task-list order. Draft and
    /// live state play no part.
    pub fn missing_sections(&self) -> Vec<MissingSection> {
        MANDATORY
            .iter()
            .filter(|(section, _)| self.status_of(*section) != TaskStatus::Completed)
            .map(|(_, missing)| *missing)
            .collect()
    }

    pub fn task_statuses(&self) -> TaskStatuses {
        TaskStatuses {
            name_status: self.name_status(),
            pages_status: self.pages_status(),
            declaration_status: self.declaration_status(),
            what_happens_next_status: self.what_happens_next_status(),
            privacy_policy_status: self.privacy_policy_status(),
            support_contact_details_status: self.support_contact_details_status(),
            make_live_status: self.make_live_status(),
        }
    }
}

fn presence_status(present: bool) -> TaskStatus {
    if present {
        TaskStatus::Completed
    } else {
        TaskStatus::NotStarted
    }
}
