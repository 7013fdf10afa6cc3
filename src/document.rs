use std::cmp::Ordering;
use std::mem;

use crate::error::DocumentError;
use crate::fragment::Fragment;

pub type DocumentResult<T> = Result<T, DocumentError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Handle to a live range registered with a [`Document`].
///
/// The handle is shared, not copied: every holder of the same `RangeId` sees
/// the boundary points as the document's mutations have adjusted them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RangeId(usize);

/// A boundary point. `offset` counts characters inside text nodes and child
/// slots inside every other node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockStyle {
    pub fg: Rgb,
    pub bg: Option<Rgb>,
    pub border: Option<Rgb>,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Root,
    Line,
    Text(String),
    Strong,
    Break,
    Fragment(Box<Fragment>),
    TextBlock(BlockStyle),
}

#[derive(Clone, Debug)]
pub struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Root | NodeKind::Line | NodeKind::Strong | NodeKind::TextBlock(_)
        )
    }

    pub fn is_editable(&self) -> bool {
        !matches!(self.kind, NodeKind::Fragment(_))
    }

    fn length(&self) -> usize {
        match &self.kind {
            NodeKind::Text(text) => text.chars().count(),
            _ => self.children.len(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Bounds {
    start: Position,
    end: Position,
}

/// Mutable rich-text tree with DOM-style live ranges.
///
/// Nodes live in an arena and are never freed; removing a node only detaches
/// it. Every registered range is adjusted in place by each mutation, which is
/// what lets a fragment's action act on "the same range" long after it was
/// captured.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    ranges: Vec<Option<Bounds>>,
    root: NodeId,
    caret: RangeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::from_lines(&[""])
    }

    pub fn from_lines(lines: &[&str]) -> Self {
        let root = NodeId(0);
        let mut document = Self {
            nodes: vec![Node::new(NodeKind::Root)],
            ranges: vec![Some(Bounds {
                start: Position::new(root, 0),
                end: Position::new(root, 0),
            })],
            root,
            caret: RangeId(0),
        };
        for line in lines {
            document.push_line(line);
        }
        if let Some(text) = document.first_text_node() {
            let pos = Position::new(text, 0);
            document.ranges[0] = Some(Bounds {
                start: pos,
                end: pos,
            });
        }
        document
    }

    /// Append a line holding a single text node and return the line.
    pub fn push_line(&mut self, text: &str) -> NodeId {
        let line = self.create_node(NodeKind::Line);
        let text = self.create_text(text);
        self.link(line, text);
        self.link(self.root, line);
        line
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The collapsed live range that tracks the editing caret.
    pub fn caret(&self) -> RangeId {
        self.caret
    }

    pub fn caret_position(&self) -> Position {
        self.ranges[self.caret.0]
            .map(|bounds| bounds.end)
            .unwrap_or(Position::new(self.root, 0))
    }

    pub fn set_caret(&mut self, position: Position) -> DocumentResult<()> {
        self.set_range(self.caret, position, position)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_ref(&self, id: NodeId) -> DocumentResult<&Node> {
        self.nodes.get(id.0).ok_or(DocumentError::UnknownNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(Node::kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Character length for text nodes, child count for everything else.
    pub fn node_length(&self, id: NodeId) -> usize {
        self.node(id).map(Node::length).unwrap_or(0)
    }

    pub fn fragment(&self, id: NodeId) -> Option<&Fragment> {
        match self.kind(id)? {
            NodeKind::Fragment(fragment) => Some(fragment.as_ref()),
            _ => None,
        }
    }

    pub fn fragment_mut(&mut self, id: NodeId) -> Option<&mut Fragment> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Fragment(fragment) => Some(fragment.as_mut()),
            _ => None,
        }
    }

    /// Nodes below `id` in tree order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        result
    }

    pub fn first_text_node(&self) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.nodes[id.0].is_text())
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.create_node(NodeKind::Text(text.to_string()))
    }

    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind));
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DocumentResult<()> {
        let index = self.node_ref(parent)?.children.len();
        self.insert_child(parent, index, child)
    }

    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> DocumentResult<()> {
        let parent_node = self.node_ref(parent)?;
        if !parent_node.is_container() {
            return Err(DocumentError::NotAContainer(parent));
        }
        if index > parent_node.children.len() {
            return Err(DocumentError::OffsetOutOfBounds {
                node: parent,
                offset: index,
            });
        }
        let child_node = self.node_ref(child)?;
        if child == self.root
            || child_node.parent.is_some()
            || self.is_inclusive_ancestor(child, parent)
        {
            return Err(DocumentError::InvalidInsertion(child));
        }

        self.adjust_boundaries(|_, point| {
            if point.node == parent && point.offset > index {
                point.offset += 1;
            }
        });
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    /// Detach `node` from its parent. Boundary points inside the removed
    /// subtree collapse onto the slot it leaves behind.
    pub fn remove_node(&mut self, node: NodeId) -> DocumentResult<()> {
        let parent = self
            .node_ref(node)?
            .parent
            .ok_or(DocumentError::Detached(node))?;
        let index = self
            .index_in_parent(node)
            .ok_or(DocumentError::Detached(node))?;

        self.adjust_boundaries(|document, point| {
            if document.is_inclusive_ancestor(node, point.node) {
                *point = Position::new(parent, index);
            } else if point.node == parent && point.offset > index {
                point.offset -= 1;
            }
        });
        self.nodes[parent.0].children.remove(index);
        self.nodes[node.0].parent = None;
        self.release_fragment_bindings(node);
        Ok(())
    }

    // A detached fragment can never be clicked again.
    fn release_fragment_bindings(&mut self, node: NodeId) {
        let mut removed = self.descendants(node);
        removed.push(node);
        for id in removed {
            if let Some(binding) = self.fragment_mut(id).and_then(Fragment::take_binding) {
                self.release_range(binding.range);
            }
        }
    }

    /// Move the children of `from` starting at `start` into `to` at
    /// `to_index`, keeping their order.
    ///
    /// Boundary points travel with the moved children instead of collapsing.
    /// A point sitting exactly at `start` follows the moved children when it
    /// opens a non-empty range or when nothing stays behind in `from`.
    pub fn move_children(
        &mut self,
        from: NodeId,
        start: usize,
        to: NodeId,
        to_index: usize,
    ) -> DocumentResult<()> {
        let from_len = self.node_ref(from)?.children.len();
        if start > from_len {
            return Err(DocumentError::OffsetOutOfBounds {
                node: from,
                offset: start,
            });
        }
        let to_node = self.node_ref(to)?;
        if !to_node.is_container() {
            return Err(DocumentError::NotAContainer(to));
        }
        if to_index > to_node.children.len() {
            return Err(DocumentError::OffsetOutOfBounds {
                node: to,
                offset: to_index,
            });
        }
        if to == from
            || self.nodes[from.0].children[start..]
                .iter()
                .any(|moved| self.is_inclusive_ancestor(*moved, to))
        {
            return Err(DocumentError::InvalidInsertion(to));
        }

        let count = from_len - start;
        let emptied = start == 0;
        let relocate = |point: &mut Position, opens_range: bool| {
            if point.node == to && point.offset > to_index {
                point.offset += count;
            } else if point.node == from
                && (point.offset > start || (point.offset == start && (emptied || opens_range)))
            {
                *point = Position::new(to, to_index + point.offset - start);
            }
        };
        for bounds in self.ranges.iter_mut().flatten() {
            let collapsed = bounds.start == bounds.end;
            relocate(&mut bounds.start, !collapsed);
            relocate(&mut bounds.end, false);
        }

        let moved = self.nodes[from.0].children.split_off(start);
        for id in &moved {
            self.nodes[id.0].parent = Some(to);
        }
        self.nodes[to.0].children.splice(to_index..to_index, moved);
        Ok(())
    }

    pub fn insert_text(&mut self, node: NodeId, offset: usize, text: &str) -> DocumentResult<()> {
        let current = self.text_of(node)?;
        let len = current.chars().count();
        if offset > len {
            return Err(DocumentError::OffsetOutOfBounds { node, offset });
        }
        let byte_idx = char_to_byte_idx(current, offset);
        let added = text.chars().count();

        self.adjust_boundaries(|_, point| {
            if point.node == node && point.offset > offset {
                point.offset += added;
            }
        });
        if let NodeKind::Text(value) = &mut self.nodes[node.0].kind {
            value.insert_str(byte_idx, text);
        }
        Ok(())
    }

    pub fn append_text(&mut self, node: NodeId, text: &str) -> DocumentResult<()> {
        let len = self.text_of(node)?.chars().count();
        self.insert_text(node, len, text)
    }

    pub fn delete_text(&mut self, node: NodeId, offset: usize, count: usize) -> DocumentResult<()> {
        let current = self.text_of(node)?;
        let len = current.chars().count();
        if offset > len {
            return Err(DocumentError::OffsetOutOfBounds { node, offset });
        }
        let count = count.min(len - offset);
        if count == 0 {
            return Ok(());
        }
        let start = char_to_byte_idx(current, offset);
        let end = char_to_byte_idx(current, offset + count);

        self.adjust_boundaries(|_, point| {
            if point.node != node {
                return;
            }
            if point.offset > offset + count {
                point.offset -= count;
            } else if point.offset > offset {
                point.offset = offset;
            }
        });
        if let NodeKind::Text(value) = &mut self.nodes[node.0].kind {
            value.drain(start..end);
        }
        Ok(())
    }

    /// Split a text node at `offset`; the tail becomes a new sibling which is
    /// returned. Boundary points past the split move into the new node.
    pub fn split_text(&mut self, node: NodeId, offset: usize) -> DocumentResult<NodeId> {
        let current = self.text_of(node)?;
        let len = current.chars().count();
        if offset > len {
            return Err(DocumentError::OffsetOutOfBounds { node, offset });
        }
        let parent = self.parent(node).ok_or(DocumentError::Detached(node))?;
        let index = self
            .index_in_parent(node)
            .ok_or(DocumentError::Detached(node))?;
        let byte_idx = char_to_byte_idx(current, offset);
        let tail = current[byte_idx..].to_string();
        let new_node = self.create_text(&tail);

        self.adjust_boundaries(|_, point| {
            if point.node == node && point.offset > offset {
                *point = Position::new(new_node, point.offset - offset);
            } else if point.node == parent && point.offset > index {
                point.offset += 1;
            }
        });
        self.nodes[parent.0].children.insert(index + 1, new_node);
        self.nodes[new_node.0].parent = Some(parent);
        if let NodeKind::Text(value) = &mut self.nodes[node.0].kind {
            value.truncate(byte_idx);
        }
        Ok(new_node)
    }

    fn text_of(&self, node: NodeId) -> DocumentResult<&str> {
        self.node_ref(node)?
            .text()
            .ok_or(DocumentError::NotText(node))
    }

    fn adjust_boundaries(&mut self, mut adjust: impl FnMut(&Document, &mut Position)) {
        let mut ranges = mem::take(&mut self.ranges);
        for bounds in ranges.iter_mut().flatten() {
            adjust(self, &mut bounds.start);
            adjust(self, &mut bounds.end);
        }
        self.ranges = ranges;
    }

    pub fn create_range(&mut self, start: Position, end: Position) -> DocumentResult<RangeId> {
        let bounds = self.ordered_bounds(start, end)?;
        let id = match self.ranges.iter().position(Option::is_none) {
            Some(slot) => {
                self.ranges[slot] = Some(bounds);
                RangeId(slot)
            }
            None => {
                self.ranges.push(Some(bounds));
                RangeId(self.ranges.len() - 1)
            }
        };
        Ok(id)
    }

    pub fn clone_range(&mut self, range: RangeId) -> DocumentResult<RangeId> {
        let (start, end) = self.range_bounds(range)?;
        self.create_range(start, end)
    }

    pub fn release_range(&mut self, range: RangeId) {
        if range == self.caret {
            return;
        }
        if let Some(slot) = self.ranges.get_mut(range.0) {
            *slot = None;
        }
    }

    pub fn range_count(&self) -> usize {
        self.ranges.iter().flatten().count()
    }

    pub fn range_bounds(&self, range: RangeId) -> DocumentResult<(Position, Position)> {
        let bounds = self.bounds(range)?;
        Ok((bounds.start, bounds.end))
    }

    fn bounds(&self, range: RangeId) -> DocumentResult<Bounds> {
        self.ranges
            .get(range.0)
            .copied()
            .flatten()
            .ok_or(DocumentError::ReleasedRange(range))
    }

    pub fn set_range(
        &mut self,
        range: RangeId,
        start: Position,
        end: Position,
    ) -> DocumentResult<()> {
        self.bounds(range)?;
        let bounds = self.ordered_bounds(start, end)?;
        self.ranges[range.0] = Some(bounds);
        Ok(())
    }

    pub fn collapse_range(&mut self, range: RangeId, to_start: bool) -> DocumentResult<()> {
        let bounds = self.bounds(range)?;
        let point = if to_start { bounds.start } else { bounds.end };
        self.ranges[range.0] = Some(Bounds {
            start: point,
            end: point,
        });
        Ok(())
    }

    pub fn set_start_after(&mut self, range: RangeId, node: NodeId) -> DocumentResult<()> {
        let bounds = self.bounds(range)?;
        let parent = self.parent(node).ok_or(DocumentError::Detached(node))?;
        let index = self
            .index_in_parent(node)
            .ok_or(DocumentError::Detached(node))?;
        let start = Position::new(parent, index + 1);
        let end = if self.compare_positions(start, bounds.end)? == Ordering::Greater {
            start
        } else {
            bounds.end
        };
        self.set_range(range, start, end)
    }

    pub fn range_is_collapsed(&self, range: RangeId) -> DocumentResult<bool> {
        let bounds = self.bounds(range)?;
        Ok(bounds.start == bounds.end)
    }

    fn ordered_bounds(&self, start: Position, end: Position) -> DocumentResult<Bounds> {
        self.validate_position(start)?;
        self.validate_position(end)?;
        if self.compare_positions(start, end)? == Ordering::Greater {
            Ok(Bounds {
                start: end,
                end: start,
            })
        } else {
            Ok(Bounds { start, end })
        }
    }

    fn validate_position(&self, position: Position) -> DocumentResult<()> {
        let node = self.node_ref(position.node)?;
        if !self.is_attached(position.node) {
            return Err(DocumentError::Detached(position.node));
        }
        if position.offset > node.length() {
            return Err(DocumentError::OffsetOutOfBounds {
                node: position.node,
                offset: position.offset,
            });
        }
        Ok(())
    }

    fn path_of(&self, node: NodeId) -> DocumentResult<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = node;
        while current != self.root {
            let index = self
                .index_in_parent(current)
                .ok_or(DocumentError::Detached(node))?;
            path.push(index);
            current = self.parent(current).ok_or(DocumentError::Detached(node))?;
        }
        path.reverse();
        Ok(path)
    }

    // A point "before child k" sorts as the prefix of child k's own path, so
    // lexicographic order on these keys is tree order.
    fn point_key(&self, position: Position) -> DocumentResult<Vec<usize>> {
        let mut key = self.path_of(position.node)?;
        key.push(position.offset);
        Ok(key)
    }

    pub fn compare_positions(&self, a: Position, b: Position) -> DocumentResult<Ordering> {
        Ok(self.point_key(a)?.cmp(&self.point_key(b)?))
    }

    /// Topmost nodes lying entirely between `start` and `end`.
    fn contained_nodes(&self, start: Position, end: Position) -> DocumentResult<Vec<NodeId>> {
        let start_key = self.point_key(start)?;
        let end_key = self.point_key(end)?;
        let mut contained: Vec<NodeId> = Vec::new();
        for node in self.descendants(self.root) {
            let mut head = self.path_of(node)?;
            let mut tail = head.clone();
            head.push(0);
            tail.push(self.node_length(node));
            if head > start_key && tail < end_key {
                let parent_contained = self
                    .parent(node)
                    .is_some_and(|parent| contained.contains(&parent));
                if !parent_contained {
                    contained.push(node);
                }
            }
        }
        Ok(contained)
    }

    /// The range's text the way a DOM range stringifies it: text nodes and
    /// fragment labels between the boundary points.
    pub fn range_text(&self, range: RangeId) -> DocumentResult<String> {
        let Bounds { start, end } = self.bounds(range)?;
        if start.node == end.node {
            if let Some(text) = self.node_ref(start.node)?.text() {
                return Ok(char_slice(text, start.offset, end.offset));
            }
        }

        let mut out = String::new();
        if let Some(text) = self.node_ref(start.node)?.text() {
            out.push_str(&char_slice(text, start.offset, usize::MAX));
        }
        for node in self.contained_nodes(start, end)? {
            out.push_str(&self.text_content(node));
        }
        if let Some(text) = self.node_ref(end.node)?.text() {
            out.push_str(&char_slice(text, 0, end.offset));
        }
        Ok(out)
    }

    pub fn delete_range_contents(&mut self, range: RangeId) -> DocumentResult<()> {
        let Bounds { start, end } = self.bounds(range)?;
        if start == end {
            return Ok(());
        }
        if start.node == end.node && self.node_ref(start.node)?.is_text() {
            self.delete_text(start.node, start.offset, end.offset - start.offset)?;
            return self.set_range(range, start, start);
        }

        let collapse_to = if self.is_inclusive_ancestor(start.node, end.node) {
            start
        } else {
            let mut reference = start.node;
            while let Some(parent) = self.parent(reference) {
                if self.is_inclusive_ancestor(parent, end.node) {
                    break;
                }
                reference = parent;
            }
            let parent = self
                .parent(reference)
                .ok_or(DocumentError::Detached(reference))?;
            let index = self
                .index_in_parent(reference)
                .ok_or(DocumentError::Detached(reference))?;
            Position::new(parent, index + 1)
        };

        let contained = self.contained_nodes(start, end)?;
        if self.node_ref(start.node)?.is_text() {
            let len = self.node_length(start.node);
            self.delete_text(start.node, start.offset, len - start.offset)?;
        }
        for node in contained {
            self.remove_node(node)?;
        }
        if self.node_ref(end.node)?.is_text() {
            self.delete_text(end.node, 0, end.offset)?;
        }
        self.set_range(range, collapse_to, collapse_to)
    }

    /// Resolve a boundary point into a `(parent, index)` child slot, splitting
    /// a text node when the point falls inside one.
    fn insertion_slot(&mut self, position: Position) -> DocumentResult<(NodeId, usize)> {
        let node = self.node_ref(position.node)?;
        if !node.is_text() {
            if !node.is_container() {
                return Err(DocumentError::NotAContainer(position.node));
            }
            return Ok((position.node, position.offset));
        }
        let len = node.length();
        let parent = self
            .parent(position.node)
            .ok_or(DocumentError::Detached(position.node))?;
        let index = self
            .index_in_parent(position.node)
            .ok_or(DocumentError::Detached(position.node))?;
        if position.offset == 0 {
            Ok((parent, index))
        } else if position.offset >= len {
            Ok((parent, index + 1))
        } else {
            self.split_text(position.node, position.offset)?;
            Ok((parent, index + 1))
        }
    }

    /// Insert `node` at `position` and return the point right after it.
    pub fn insert_at(&mut self, position: Position, node: NodeId) -> DocumentResult<Position> {
        let (parent, index) = self.insertion_slot(position)?;
        self.insert_child(parent, index, node)?;
        Ok(Position::new(parent, index + 1))
    }

    /// Insert `node` at the start of `range`. A collapsed range grows to
    /// span the inserted node.
    pub fn insert_node_at_range(&mut self, range: RangeId, node: NodeId) -> DocumentResult<()> {
        let Bounds { start, end } = self.bounds(range)?;
        let collapsed = start == end;
        let starts_text = self.node_ref(start.node)?.is_text();
        let (parent, index) = self.insertion_slot(start)?;
        self.insert_child(parent, index, node)?;

        let current = self.bounds(range)?;
        let new_start = if starts_text && start.offset == 0 {
            Position::new(parent, index)
        } else {
            current.start
        };
        let new_end = if collapsed {
            Position::new(parent, index + 1)
        } else {
            current.end
        };
        self.set_range(range, new_start, new_end)
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        match &node.kind {
            NodeKind::Text(text) => text.clone(),
            NodeKind::Fragment(fragment) => fragment.visible_text(),
            NodeKind::Break => String::new(),
            _ => node
                .children
                .iter()
                .map(|child| self.text_content(*child))
                .collect(),
        }
    }

    /// Text of the whole note, one `\n` per line and per line break.
    pub fn plain_text(&self) -> String {
        let lines: Vec<String> = self
            .children(self.root)
            .iter()
            .map(|line| {
                let mut out = String::new();
                self.collect_plain_text(*line, &mut out);
                out
            })
            .collect();
        lines.join("\n")
    }

    fn collect_plain_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Break => out.push('\n'),
            NodeKind::Fragment(fragment) => out.push_str(&fragment.visible_text()),
            _ => {
                for child in &node.children {
                    self.collect_plain_text(*child, out);
                }
            }
        }
    }

    /// HTML-like serialisation of the attached tree.
    pub fn markup(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root) {
            self.write_markup(*child, &mut out);
        }
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        let (open, close) = match &node.kind {
            NodeKind::Text(text) => {
                out.push_str(&escape_text(text));
                return;
            }
            NodeKind::Break => {
                out.push_str("<br>");
                return;
            }
            NodeKind::Fragment(fragment) => {
                out.push_str("<div contenteditable=\"false\">");
                out.push_str(fragment.markup().as_str());
                out.push_str("</div>");
                return;
            }
            NodeKind::Root => ("", ""),
            NodeKind::Line => ("<div>", "</div>"),
            NodeKind::Strong => ("<strong>", "</strong>"),
            NodeKind::TextBlock(_) => ("<div class=\"generated\">", "</div>"),
        };
        out.push_str(open);
        for child in &node.children {
            self.write_markup(*child, out);
        }
        out.push_str(close);
    }
}

pub fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    for (count, (byte_idx, _)) in text.char_indices().enumerate() {
        if count == char_idx {
            return byte_idx;
        }
    }
    text.len()
}

fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod document_tests;
