use super::DocumentEditor;
use crate::document::{Position, RangeId};

/// A captured span of the note plus its trimmed text.
///
/// `range` is a live handle owned by the document. Cloning an anchor shares
/// the handle; it never snapshots the boundary points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionAnchor {
    pub range: RangeId,
    pub text: String,
}

/// The part of `text` between the last `\n` before `offset` and `offset`.
pub fn line_before_offset(text: &str, offset: usize) -> &str {
    let end = crate::document::char_to_byte_idx(text, offset);
    let head = &text[..end];
    match head.rfind('\n') {
        Some(newline) => &head[newline + 1..],
        None => head,
    }
}

impl DocumentEditor {
    /// Capture the current mark-to-caret selection. Whitespace-only and empty
    /// selections produce nothing and register no range.
    pub fn capture_from_user_selection(&mut self) -> Option<SelectionAnchor> {
        let (start, end) = self.selection()?;
        let document = self.document_mut();
        let range = document.create_range(start, end).ok()?;
        let text = document
            .range_text(range)
            .map(|text| text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            document.release_range(range);
            return None;
        }
        Some(SelectionAnchor { range, text })
    }

    /// Capture the text of the caret's line up to the caret.
    ///
    /// Inside a text node the line starts after the nearest preceding `\n` of
    /// that node only; text in sibling inline nodes is not joined. On an
    /// element boundary the whole element's text is used and the range covers
    /// the element's contents.
    pub fn capture_from_current_line(&mut self) -> Option<SelectionAnchor> {
        let caret = self.caret();
        let document = self.document_mut();
        let node = document.node(caret.node)?;

        let (text, start, end) = match node.text() {
            Some(content) => {
                // The range ends at the caret and is as long as the trimmed
                // text, so trailing blanks shift it left.
                let text = line_before_offset(content, caret.offset).trim().to_string();
                let len = text.chars().count();
                let start = Position::new(caret.node, caret.offset.saturating_sub(len));
                (text, start, caret)
            }
            None => {
                let text = document.text_content(caret.node).trim().to_string();
                let len = document.node_length(caret.node);
                (
                    text,
                    Position::new(caret.node, 0),
                    Position::new(caret.node, len),
                )
            }
        };
        if text.is_empty() {
            return None;
        }
        let range = document.create_range(start, end).ok()?;
        Some(SelectionAnchor { range, text })
    }
}
