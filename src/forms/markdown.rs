//! Guidance markdown validation.
//!
//! Page guidance may only use links, level-2 headings (`##`), bulleted lists
//! (`*` or `-`) and numbered lists (`1.`). Anything else is reported as an
//! unsupported construct, and text longer than the limit is reported as
//! `too_long`. Both kinds can be present at once.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

pub const GUIDANCE_MARKDOWN_MAX_LENGTH: usize = 4999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkdownError {
    TooLong,
    UnsupportedHeading,
    UnsupportedEmphasis,
    UnsupportedImage,
    UnsupportedBlockquote,
    UnsupportedCode,
    UnsupportedHtml,
    UnsupportedTable,
    UnsupportedHorizontalRule,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownValidation {
    pub errors: BTreeSet<MarkdownError>,
}

impl MarkdownValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn too_long(&self) -> bool {
        self.errors.contains(&MarkdownError::TooLong)
    }

    pub fn has_unsupported_syntax(&self) -> bool {
        self.errors.iter().any(|e| *e != MarkdownError::TooLong)
    }
}

pub trait MarkdownValidator: Send + Sync {
    fn validate(&self, text: &str) -> MarkdownValidation;

    /// Longest accepted text, in characters.
    fn max_length(&self) -> usize {
        GUIDANCE_MARKDOWN_MAX_LENGTH
    }
}

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(```|~~~)").unwrap());
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[*+-]|\d{1,9}[.)])\s+").unwrap());
static ATX_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})(?:\s|$)").unwrap());
static SETEXT_UNDERLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^=+\s*$").unwrap());
static SETEXT_H2_UNDERLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-{2,}\s*$").unwrap());
static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?:-\s*){3,}|(?:\*\s*){3,}|(?:_\s*){3,})$").unwrap());
static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|?\s*:?-{3,}:?\s*(?:\|\s*:?-{3,}:?\s*)+\|?\s*$").unwrap());
static IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static LINK_TARGET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\]\([^)]*\)").unwrap());
static AUTOLINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:https?://|mailto:)[^>\s]+>").unwrap());
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9-]*(?:\s[^>]*)?/?>").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`]+`").unwrap());
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*[^*]+\*\*|__[^_]+__|\*[^*\s][^*]*\*|(?:^|[^\w])_[^_\s][^_]*_(?:[^\w]|$)")
        .unwrap()
});

/// Validator for the form-guidance markdown subset.
#[derive(Debug, Clone)]
pub struct GuidanceMarkdown {
    max_length: usize,
}

impl Default for GuidanceMarkdown {
    fn default() -> Self {
        Self {
            max_length: GUIDANCE_MARKDOWN_MAX_LENGTH,
        }
    }
}

impl GuidanceMarkdown {
    fn check_line(&self, line: &str, prev_blank: bool, errors: &mut BTreeSet<MarkdownError>) {
        let trimmed = line.trim_start();
        let indent: usize = line
            .chars()
            .take_while(|c| c.is_whitespace())
            .map(|c| if c == '\t' { 4 } else { 1 })
            .sum();
        let list_item = LIST_ITEM.is_match(trimmed);

        if indent >= 4 && prev_blank && !list_item {
            errors.insert(MarkdownError::UnsupportedCode);
            return;
        }

        // Underlining a paragraph line with dashes makes it a level-2 heading.
        if !prev_blank && SETEXT_H2_UNDERLINE.is_match(trimmed) {
            return;
        }
        if HORIZONTAL_RULE.is_match(trimmed) {
            errors.insert(MarkdownError::UnsupportedHorizontalRule);
            return;
        }
        if SETEXT_UNDERLINE.is_match(trimmed) && !prev_blank {
            errors.insert(MarkdownError::UnsupportedHeading);
            return;
        }
        if trimmed.starts_with('>') {
            errors.insert(MarkdownError::UnsupportedBlockquote);
        }
        if trimmed.starts_with('|') || TABLE_SEPARATOR.is_match(trimmed) {
            errors.insert(MarkdownError::UnsupportedTable);
        }

        let mut content = trimmed;
        if let Some(caps) = ATX_HEADING.captures(trimmed) {
            if caps[1].len() != 2 {
                errors.insert(MarkdownError::UnsupportedHeading);
            }
            content = trimmed[caps[0].len()..].trim_start();
        } else if let Some(m) = LIST_ITEM.find(trimmed) {
            content = &trimmed[m.end()..];
        }

        self.check_inline(content, errors);
    }

    fn check_inline(&self, content: &str, errors: &mut BTreeSet<MarkdownError>) {
        if IMAGE.is_match(content) {
            errors.insert(MarkdownError::UnsupportedImage);
        }

        // Link targets and autolinks are allowed and may legitimately contain
        // underscores, asterisks or angle brackets.
        let without_targets = LINK_TARGET.replace_all(content, "]()");
        let without_links = AUTOLINK.replace_all(&without_targets, "");

        if HTML_TAG.is_match(&without_links) {
            errors.insert(MarkdownError::UnsupportedHtml);
        }
        if INLINE_CODE.is_match(&without_links) {
            errors.insert(MarkdownError::UnsupportedCode);
        }
        if EMPHASIS.is_match(&without_links) {
            errors.insert(MarkdownError::UnsupportedEmphasis);
        }
    }
}

impl MarkdownValidator for GuidanceMarkdown {
    fn max_length(&self) -> usize {
        self.max_length
    }

    fn validate(&self, text: &str) -> MarkdownValidation {
        let mut errors = BTreeSet::new();

        if text.chars().count() > self.max_length {
            errors.insert(MarkdownError::TooLong);
        }

        let mut in_fence = false;
        let mut prev_blank = true;
        for line in text.lines() {
            if FENCE.is_match(line.trim_start()) {
                errors.insert(MarkdownError::UnsupportedCode);
                in_fence = !in_fence;
                prev_blank = false;
                continue;
            }
            if in_fence {
                continue;
            }
            if line.trim().is_empty() {
                prev_blank = true;
                continue;
            }
            self.check_line(line, prev_blank, &mut errors);
            prev_blank = false;
        }

        MarkdownValidation { errors }
    }
}
