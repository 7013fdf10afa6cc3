use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use strum::{AsRefStr, Display, EnumString};

use crate::document::{BlockStyle, RangeId};
use crate::sanitize::SanitizedMarkup;

static CONTROL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<[A-Za-z][A-Za-z0-9]*\b[^>]*?\bdata-action="([^"]*)"[^>]*>([^<]*)"#)
        .expect("control pattern is valid")
});

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// The two behaviours a generated control may trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum FragmentAction {
    DeleteSelectedText,
    WrapWithBold,
}

/// A clickable element inside a fragment, as found in its sanitized markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionControl {
    pub action: String,
    pub label: String,
}

impl ActionControl {
    pub fn action(&self) -> Option<FragmentAction> {
        self.action.parse().ok()
    }
}

/// Binding installed on a fragment when it is spliced in.
///
/// `range` is the anchor's own live range handle, not a snapshot: edits made
/// after the splice are reflected when the action eventually runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionBinding {
    pub range: RangeId,
    pub anchor_text: String,
}

/// A non-editable block of generated interactive markup.
#[derive(Clone, Debug)]
pub struct Fragment {
    markup: SanitizedMarkup,
    style: BlockStyle,
    controls: Vec<ActionControl>,
    binding: Option<ActionBinding>,
}

impl Fragment {
    pub fn new(markup: SanitizedMarkup, style: BlockStyle) -> Self {
        let controls = extract_controls(markup.as_str());
        Self {
            markup,
            style,
            controls,
            binding: None,
        }
    }

    pub fn markup(&self) -> &SanitizedMarkup {
        &self.markup
    }

    pub fn style(&self) -> BlockStyle {
        self.style
    }

    pub fn controls(&self) -> &[ActionControl] {
        &self.controls
    }

    pub fn binding(&self) -> Option<&ActionBinding> {
        self.binding.as_ref()
    }

    pub fn bind(&mut self, binding: ActionBinding) {
        self.binding = Some(binding);
    }

    /// Consume the binding; a fragment acts at most once.
    pub fn take_binding(&mut self) -> Option<ActionBinding> {
        self.binding.take()
    }

    /// The markup's text with tags removed and whitespace collapsed.
    pub fn visible_text(&self) -> String {
        strip_tags(self.markup.as_str())
    }

    /// Like [`Fragment::visible_text`], without the controls' labels.
    pub fn body_text(&self) -> String {
        let markup = self.markup.as_str();
        let mut body = String::with_capacity(markup.len());
        let mut from = 0;
        for span in control_spans(markup) {
            body.push_str(&markup[from..span.whole.start]);
            body.push(' ');
            from = span.whole.end;
        }
        body.push_str(&markup[from..]);
        strip_tags(&body)
    }
}

fn strip_tags(markup: &str) -> String {
    let stripped = TAG_PATTERN.replace_all(markup, " ");
    let words: Vec<&str> = stripped.split_whitespace().collect();
    decode_entities(&words.join(" "))
}

/// A control element: its whole extent, action name and inner markup.
struct ControlSpan<'a> {
    whole: Range<usize>,
    action: &'a str,
    inner: &'a str,
}

fn control_spans(markup: &str) -> Vec<ControlSpan<'_>> {
    let lowered = markup.to_ascii_lowercase();
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(captures) = CONTROL_PATTERN.captures_at(markup, from) {
        let (Some(open), Some(tag), Some(action)) = (captures.get(0), captures.get(1), captures.get(2))
        else {
            break;
        };
        let closing = format!("</{}>", tag.as_str().to_ascii_lowercase());
        // An unclosed control has no label of its own.
        let (inner, end) = match lowered[open.end()..].find(&closing) {
            Some(at) => (
                &markup[open.end()..open.end() + at],
                open.end() + at + closing.len(),
            ),
            None => ("", open.end()),
        };
        spans.push(ControlSpan {
            whole: open.start()..end,
            action: action.as_str(),
            inner,
        });
        from = end;
    }
    spans
}

fn extract_controls(markup: &str) -> Vec<ActionControl> {
    control_spans(markup)
        .into_iter()
        .map(|span| {
            let label = strip_tags(span.inner);
            let label = if label.is_empty() {
                span.action.to_string()
            } else {
                label
            };
            ActionControl {
                action: span.action.to_string(),
                label,
            }
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
