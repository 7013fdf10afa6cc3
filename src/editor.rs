use crate::document::{Document, NodeId, NodeKind, Position, RangeId};

mod cursor;
mod selection;

pub use selection::{SelectionAnchor, line_before_offset};

/// An editable text node, in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentRef {
    pub node: NodeId,
    pub line: NodeId,
    pub len: usize,
}

pub fn collect_segments(document: &Document) -> Vec<SegmentRef> {
    let mut result = Vec::new();
    for line in document.children(document.root()) {
        for node in document.descendants(*line) {
            if let Some(NodeKind::Text(text)) = document.kind(node) {
                result.push(SegmentRef {
                    node,
                    line: *line,
                    len: text.chars().count(),
                });
            }
        }
    }
    result
}

pub struct DocumentEditor {
    document: Document,
    mark: Option<RangeId>,
}

impl DocumentEditor {
    pub fn new(document: Document) -> Self {
        let mut editor = Self {
            document,
            mark: None,
        };
        editor.ensure_cursor_selectable();
        editor
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct tree access for splicing. Callers that move nodes around should
    /// finish with [`DocumentEditor::ensure_cursor_selectable`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn segments(&self) -> Vec<SegmentRef> {
        collect_segments(&self.document)
    }

    pub fn caret(&self) -> Position {
        self.document.caret_position()
    }

    /// Make sure the caret points into a line, creating an empty line when
    /// the note has none. A caret left between lines moves to the nearest
    /// text segment.
    pub fn ensure_cursor_selectable(&mut self) {
        let caret = self.caret();
        let valid = self.document.is_attached(caret.node)
            && caret.offset <= self.document.node_length(caret.node);
        if valid && caret.node != self.document.root() {
            return;
        }
        let segments = self.segments();
        let resolved = if valid {
            self.caret_segment(&segments)
                .map(|(index, offset)| Position::new(segments[index].node, offset))
        } else {
            None
        };
        let target = resolved.or_else(|| {
            segments
                .first()
                .map(|segment| Position::new(segment.node, 0))
        });
        if let Some(position) = target {
            let _ = self.document.set_caret(position);
            return;
        }
        let line = self.document.push_line("");
        if let Some(text) = self.document.children(line).first().copied() {
            let _ = self.document.set_caret(Position::new(text, 0));
        }
    }

    /// The top-level line holding `node`.
    pub fn line_of(&self, node: NodeId) -> Option<NodeId> {
        let root = self.document.root();
        let mut current = node;
        loop {
            let parent = self.document.parent(current)?;
            if parent == root {
                return Some(current);
            }
            current = parent;
        }
    }

    pub fn current_line(&self) -> Option<NodeId> {
        let caret = self.caret();
        if caret.node == self.document.root() {
            return self.document.children(caret.node).get(caret.offset).copied();
        }
        self.line_of(caret.node)
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        if ch == '\n' {
            return self.insert_line_break();
        }
        self.delete_selection();
        self.ensure_cursor_selectable();
        let caret = self.caret();
        let Some((is_text, is_container)) = self
            .document
            .node(caret.node)
            .map(|node| (node.is_text(), node.is_container()))
        else {
            return false;
        };
        if is_text {
            let mut buf = [0u8; 4];
            if self
                .document
                .insert_text(caret.node, caret.offset, ch.encode_utf8(&mut buf))
                .is_err()
            {
                return false;
            }
            return self
                .document
                .set_caret(Position::new(caret.node, caret.offset + 1))
                .is_ok();
        }
        if !is_container || caret.node == self.document.root() {
            return false;
        }
        let text = self.document.create_text(&ch.to_string());
        if self
            .document
            .insert_child(caret.node, caret.offset, text)
            .is_err()
        {
            return false;
        }
        self.document.set_caret(Position::new(text, 1)).is_ok()
    }

    pub fn insert_text(&mut self, text: &str) -> bool {
        text.chars().all(|ch| self.insert_char(ch))
    }

    /// Split the current line at the caret; everything after the caret moves
    /// to a new line below.
    pub fn insert_line_break(&mut self) -> bool {
        self.delete_selection();
        self.ensure_cursor_selectable();
        let caret = self.caret();
        let Some(line) = self.current_line() else {
            return false;
        };
        let root = self.document.root();
        let Some(line_index) = self.document.index_in_parent(line) else {
            return false;
        };
        let new_line = self.document.create_node(NodeKind::Line);
        if self
            .document
            .insert_child(root, line_index + 1, new_line)
            .is_err()
        {
            return false;
        }

        let split_from = if caret.node == line {
            Some(caret.offset)
        } else if self.document.parent(caret.node) == Some(line)
            && self.document.node(caret.node).is_some_and(|n| n.is_text())
        {
            let index = self.document.index_in_parent(caret.node).unwrap_or(0);
            let len = self.document.node_length(caret.node);
            if caret.offset == 0 {
                Some(index)
            } else if caret.offset >= len {
                Some(index + 1)
            } else if self.document.split_text(caret.node, caret.offset).is_ok() {
                Some(index + 1)
            } else {
                None
            }
        } else {
            None
        };

        if let Some(from) = split_from
            && self.document.move_children(line, from, new_line, 0).is_err()
        {
            return false;
        }

        let first_text = match self.document.children(new_line).first().copied() {
            Some(first) if self.document.node(first).is_some_and(|n| n.is_text()) => first,
            _ => {
                let text = self.document.create_text("");
                if self.document.insert_child(new_line, 0, text).is_err() {
                    return false;
                }
                text
            }
        };
        if self.line_has_no_text(line) {
            let text = self.document.create_text("");
            let _ = self.document.append_child(line, text);
        }
        self.clear_mark();
        self.document.set_caret(Position::new(first_text, 0)).is_ok()
    }

    fn line_has_no_text(&self, line: NodeId) -> bool {
        !self
            .document
            .descendants(line)
            .iter()
            .any(|node| self.document.node(*node).is_some_and(|n| n.is_text()))
    }

    pub fn backspace(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        let caret = self.caret();
        let Some(node) = self.document.node(caret.node) else {
            return false;
        };
        if node.is_text() && caret.offset > 0 {
            return self
                .document
                .delete_text(caret.node, caret.offset - 1, 1)
                .is_ok();
        }

        match self.node_before(caret) {
            Some(previous) => self.remove_backward_into(previous),
            None => self.merge_with_previous_line(),
        }
    }

    /// The node that ends right before `position` within its line, if any.
    fn node_before(&self, position: Position) -> Option<NodeId> {
        let is_text = self
            .document
            .node(position.node)
            .is_some_and(|n| n.is_text());
        if !is_text && position.offset > 0 {
            return self
                .document
                .children(position.node)
                .get(position.offset - 1)
                .copied();
        }
        let root = self.document.root();
        let mut current = position.node;
        loop {
            let parent = self.document.parent(current)?;
            let index = self.document.index_in_parent(current)?;
            if index > 0 {
                return self.document.children(parent).get(index - 1).copied();
            }
            if parent == root || self.document.parent(parent) == Some(root) {
                return None;
            }
            current = parent;
        }
    }

    fn remove_backward_into(&mut self, previous: NodeId) -> bool {
        let Some(kind) = self.document.kind(previous) else {
            return false;
        };
        let text_len = match kind {
            NodeKind::Text(text) => Some(text.chars().count()),
            NodeKind::Strong | NodeKind::TextBlock(_) => None,
            NodeKind::Break | NodeKind::Fragment(_) => {
                return self.document.remove_node(previous).is_ok();
            }
            NodeKind::Root | NodeKind::Line => return false,
        };

        match text_len {
            Some(0) => {
                self.document.remove_node(previous).is_ok() && self.backspace_after_cleanup()
            }
            Some(len) => {
                self.document.delete_text(previous, len - 1, 1).is_ok()
                    && self
                        .document
                        .set_caret(Position::new(previous, len - 1))
                        .is_ok()
            }
            None => {
                let last_text = self
                    .document
                    .descendants(previous)
                    .into_iter()
                    .rev()
                    .find(|node| self.document.node(*node).is_some_and(|n| n.is_text()));
                match last_text {
                    Some(text) => {
                        let len = self.document.node_length(text);
                        self.document.set_caret(Position::new(text, len)).is_ok()
                            && self.backspace()
                    }
                    None => self.document.remove_node(previous).is_ok(),
                }
            }
        }
    }

    // An empty text node swallowed the keypress; keep deleting backward.
    fn backspace_after_cleanup(&mut self) -> bool {
        self.ensure_cursor_selectable();
        self.backspace()
    }

    fn merge_with_previous_line(&mut self) -> bool {
        let caret = self.caret();
        let Some(line) = self.current_line() else {
            return false;
        };
        let root = self.document.root();
        let Some(index) = self.document.index_in_parent(line) else {
            return false;
        };
        if index == 0 {
            return false;
        }
        let Some(previous_line) = self.document.children(root).get(index - 1).copied() else {
            return false;
        };
        let end = self.document.children(previous_line).len();
        if self
            .document
            .move_children(line, 0, previous_line, end)
            .is_err()
        {
            return false;
        }
        if self.document.remove_node(line).is_err() {
            return false;
        }
        if self.document.is_attached(caret.node) {
            let _ = self.document.set_caret(caret);
        } else {
            self.ensure_cursor_selectable();
        }
        true
    }

    pub fn set_mark(&mut self) {
        if self.mark.is_some() {
            return;
        }
        let caret = self.caret();
        self.mark = self.document.create_range(caret, caret).ok();
    }

    pub fn clear_mark(&mut self) {
        if let Some(mark) = self.mark.take() {
            self.document.release_range(mark);
        }
    }

    pub fn has_mark(&self) -> bool {
        self.mark.is_some()
    }

    /// Select from `start` to `end`, leaving the caret at `end`.
    pub fn select(&mut self, start: Position, end: Position) -> bool {
        self.clear_mark();
        if self.document.set_caret(start).is_err() {
            return false;
        }
        self.set_mark();
        self.document.set_caret(end).is_ok()
    }

    /// The non-empty selection between mark and caret, in document order.
    pub fn selection(&self) -> Option<(Position, Position)> {
        let mark = self.mark?;
        let (anchor, _) = self.document.range_bounds(mark).ok()?;
        let caret = self.caret();
        if anchor == caret {
            return None;
        }
        match self.document.compare_positions(anchor, caret).ok()? {
            std::cmp::Ordering::Greater => Some((caret, anchor)),
            _ => Some((anchor, caret)),
        }
    }

    pub fn selection_text(&mut self) -> Option<String> {
        let (start, end) = self.selection()?;
        let range = self.document.create_range(start, end).ok()?;
        let text = self.document.range_text(range).ok();
        self.document.release_range(range);
        text
    }

    pub fn delete_selection(&mut self) -> bool {
        let Some((start, end)) = self.selection() else {
            self.clear_mark();
            return false;
        };
        self.clear_mark();
        let Ok(range) = self.document.create_range(start, end) else {
            return false;
        };
        let deleted = self.document.delete_range_contents(range).is_ok();
        if deleted {
            if let Ok((point, _)) = self.document.range_bounds(range) {
                let _ = self.document.set_caret(point);
            }
        }
        self.document.release_range(range);
        deleted
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;

#[cfg(test)]
#[path = "editor/cursor_tests.rs"]
mod cursor_tests;
