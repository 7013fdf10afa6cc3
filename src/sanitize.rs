//! Trust boundary for model-produced markup.
//!
//! Nothing reaches the note as markup unless it went through a [`Sanitizer`]:
//! [`SanitizedMarkup`] has no public constructor other than
//! [`SanitizedMarkup::from_untrusted`], and the splicer only accepts that type.

use ammonia::Builder;
use tracing::debug;

use crate::error::SanitizeError;

/// Attribute carrying a fragment control's action identifier.
pub const ACTION_ATTRIBUTE: &str = "data-action";

#[derive(Clone, Copy, Debug, Default)]
pub struct SanitizeOptions<'a> {
    pub additional_allowed_attributes: &'a [&'a str],
}

pub trait Sanitizer: Send + Sync {
    fn sanitize(
        &self,
        raw_html: &str,
        options: &SanitizeOptions<'_>,
    ) -> Result<String, SanitizeError>;
}

/// Sanitizer backed by ammonia's allow-list.
///
/// Ammonia's defaults drop `<button>` and `class`, which generated controls
/// depend on, so both are added on top of the default safe set.
#[derive(Clone, Debug)]
pub struct AmmoniaSanitizer {
    extra_tags: Vec<&'static str>,
    extra_attributes: Vec<&'static str>,
}

impl Default for AmmoniaSanitizer {
    fn default() -> Self {
        Self {
            extra_tags: vec!["button"],
            extra_attributes: vec!["class"],
        }
    }
}

impl AmmoniaSanitizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sanitizer for AmmoniaSanitizer {
    fn sanitize(
        &self,
        raw_html: &str,
        options: &SanitizeOptions<'_>,
    ) -> Result<String, SanitizeError> {
        let mut builder = Builder::default();
        builder
            .add_tags(self.extra_tags.iter())
            .add_generic_attributes(self.extra_attributes.iter())
            .add_generic_attributes(options.additional_allowed_attributes.iter());
        let cleaned = builder.clean(raw_html).to_string();
        debug!(
            raw_len = raw_html.len(),
            clean_len = cleaned.len(),
            "sanitized generated markup"
        );
        Ok(cleaned)
    }
}

/// Markup that has passed the sanitizer with the action attribute allowed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SanitizedMarkup(String);

impl SanitizedMarkup {
    pub fn from_untrusted(raw: &str, sanitizer: &dyn Sanitizer) -> Result<Self, SanitizeError> {
        let options = SanitizeOptions {
            additional_allowed_attributes: &[ACTION_ATTRIBUTE],
        };
        sanitizer.sanitize(raw, &options).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(raw: &str) -> String {
        SanitizedMarkup::from_untrusted(raw, &AmmoniaSanitizer::new())
            .unwrap()
            .as_str()
            .to_string()
    }

    #[test]
    fn script_tags_and_their_content_are_removed() {
        let cleaned = clean("<div>ok<script>alert('x')</script></div>");
        assert!(!cleaned.contains("<script"));
        assert!(!cleaned.contains("alert"));
        assert!(cleaned.contains("ok"));
    }

    #[test]
    fn action_attribute_survives_on_buttons() {
        let cleaned = clean(r#"<button data-action="deleteSelectedText">Delete</button>"#);
        assert!(cleaned.contains("<button"));
        assert!(cleaned.contains(r#"data-action="deleteSelectedText""#));
    }

    #[test]
    fn event_handler_attributes_are_stripped() {
        let cleaned = clean(r#"<button onclick="evil()" class="p-2">Go</button>"#);
        assert!(!cleaned.contains("onclick"));
        assert!(!cleaned.contains("evil"));
        assert!(cleaned.contains(r#"class="p-2""#));
    }

    #[test]
    fn javascript_urls_are_dropped() {
        let cleaned = clean(r#"<a href="javascript:alert(1)">x</a>"#);
        assert!(!cleaned.contains("javascript:"));
    }

    struct Rejecting;

    impl Sanitizer for Rejecting {
        fn sanitize(
            &self,
            _raw_html: &str,
            _options: &SanitizeOptions<'_>,
        ) -> Result<String, SanitizeError> {
            Err(SanitizeError::Rejected("unparseable".to_string()))
        }
    }

    #[test]
    fn sanitizer_failures_propagate() {
        let result = SanitizedMarkup::from_untrusted("<div>", &Rejecting);
        assert_eq!(
            result,
            Err(SanitizeError::Rejected("unparseable".to_string()))
        );
    }
}
