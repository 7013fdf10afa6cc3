use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::GenerationError;

pub const UI_MARKER: &str = "[UI]";
pub const TEXT_MARKER: &str = "[TEXT]";

static MARKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(UI|TEXT)\]\n?").expect("marker pattern is valid"));

// A language tag only counts on an opening fence that ends its line.
static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_+-]*\n").expect("fence pattern is valid"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassifiedResponse {
    Ui { markup: String },
    Text { body: String },
}

impl ClassifiedResponse {
    pub fn payload(&self) -> &str {
        match self {
            ClassifiedResponse::Ui { markup } => markup,
            ClassifiedResponse::Text { body } => body,
        }
    }

    pub fn is_ui(&self) -> bool {
        matches!(self, ClassifiedResponse::Ui { .. })
    }
}

/// How replies without a recognised marker line are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMode {
    /// Anything not starting with `[UI]` is text.
    #[default]
    Lenient,
    /// The reply must start with `[UI]` or `[TEXT]`.
    Strict,
}

/// Split a raw model reply into its kind and cleaned payload.
///
/// Only a leading `[UI]` selects the UI kind; a `[TEXT]` marker or no marker
/// at all both yield text.
pub fn classify(raw: &str) -> ClassifiedResponse {
    let trimmed = raw.trim();
    let payload = clean_payload(trimmed);
    if trimmed.starts_with(UI_MARKER) {
        ClassifiedResponse::Ui { markup: payload }
    } else {
        ClassifiedResponse::Text { body: payload }
    }
}

pub fn classify_strict(raw: &str) -> Result<ClassifiedResponse, GenerationError> {
    let trimmed = raw.trim();
    if trimmed.starts_with(UI_MARKER) || trimmed.starts_with(TEXT_MARKER) {
        return Ok(classify(trimmed));
    }
    let first_line: String = trimmed.lines().next().unwrap_or("").chars().take(40).collect();
    Err(GenerationError::Classification(first_line))
}

pub fn classify_with(
    mode: ClassificationMode,
    raw: &str,
) -> Result<ClassifiedResponse, GenerationError> {
    match mode {
        ClassificationMode::Lenient => Ok(classify(raw)),
        ClassificationMode::Strict => classify_strict(raw),
    }
}

fn clean_payload(trimmed: &str) -> String {
    let without_marker = MARKER_LINE.replace(trimmed, "");
    let without_openers = OPENING_FENCE.replace_all(without_marker.trim(), "");
    without_openers
        .replace("```", "")
        .replace('`', "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_marker_selects_ui_kind() {
        assert_eq!(
            classify("[UI]\n<button>hi</button>"),
            ClassifiedResponse::Ui {
                markup: "<button>hi</button>".to_string()
            }
        );
    }

    #[test]
    fn text_marker_selects_text_kind() {
        assert_eq!(
            classify("[TEXT]\nHello"),
            ClassifiedResponse::Text {
                body: "Hello".to_string()
            }
        );
    }

    #[test]
    fn unmarked_reply_defaults_to_text() {
        assert_eq!(
            classify("Just plain reply"),
            ClassifiedResponse::Text {
                body: "Just plain reply".to_string()
            }
        );
    }

    #[test]
    fn fenced_markup_is_unwrapped() {
        assert_eq!(
            classify("[UI]\n```html\n<div></div>\n```"),
            ClassifiedResponse::Ui {
                markup: "<div></div>".to_string()
            }
        );
    }

    #[test]
    fn fences_without_language_and_inline_code_are_stripped() {
        let classified = classify("  [TEXT]\n```\nUse `ls` to list\n```  ");
        assert_eq!(classified.payload(), "Use ls to list");
        assert!(!classified.is_ui());
    }

    #[test]
    fn text_after_closing_fence_survives() {
        let classified = classify("[TEXT]\n```\nAll good\n```Done");
        assert_eq!(classified.payload(), "All good\nDone");
    }

    #[test]
    fn marker_on_same_line_as_payload() {
        assert_eq!(classify("[UI]<b>x</b>").payload(), "<b>x</b>");
    }

    #[test]
    fn only_leading_marker_counts() {
        let classified = classify("Sure! [UI]\n<div></div>");
        assert!(!classified.is_ui());
        assert_eq!(classified.payload(), "Sure! [UI]\n<div></div>");
    }

    #[test]
    fn strict_mode_rejects_missing_marker() {
        let result = classify_with(ClassificationMode::Strict, "no marker here");
        assert_eq!(
            result,
            Err(GenerationError::Classification("no marker here".to_string()))
        );
        assert!(classify_with(ClassificationMode::Strict, "[TEXT]\nok").is_ok());
        assert!(classify_with(ClassificationMode::Lenient, "no marker here").is_ok());
    }
}
