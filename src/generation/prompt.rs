use crate::fragment::FragmentAction;
use crate::sanitize::ACTION_ATTRIBUTE;

/// Instruction sent with every generation request: classify the request,
/// answer with a marker line, and keep each kind within its format.
pub fn build_prompt(selected_text: &str) -> String {
    let delete = FragmentAction::DeleteSelectedText.as_ref();
    let bold = FragmentAction::WrapWithBold.as_ref();
    format!(
        r#"Based on this request: "{selected_text}", determine if this is a UI generation request or a text generation request.
If it's a UI request (like creating buttons, components, or interactive elements), respond with HTML that matches these criteria:
- Match a terminal theme (dark background, green text)
- Use {ACTION_ATTRIBUTE} attributes for interactivity, with only these values: {delete} or {bold}
- Return ONLY the raw HTML without any markdown blocks or backticks

If it's a text request (like questions, stories, or general content), respond with plain text that:
- Is concise and engaging
- Has no markdown or code formatting
- Fits the terminal theme context

Begin your response with either [UI] or [TEXT] to indicate the type, followed by a newline and your generated content."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_request_and_contract() {
        let prompt = build_prompt("make a button");
        assert!(prompt.contains(r#""make a button""#));
        assert!(prompt.contains("[UI] or [TEXT]"));
        assert!(prompt.contains("data-action"));
        assert!(prompt.contains("deleteSelectedText or wrapWithBold"));
    }
}
