use std::cmp::Ordering;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::document::{Document, NodeId, NodeKind, Position, Rgb};
use crate::fragment::Fragment;
use crate::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

/// Screen cells occupied by one fragment control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HitRegion {
    pub fragment: NodeId,
    pub action: String,
    pub line: usize,
    pub start_column: u16,
    pub end_column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    pub cursor_map: Vec<(Position, CursorVisualPosition)>,
    /// Text positions only; the targets for mouse clicks.
    pub click_map: Vec<(Position, CursorVisualPosition)>,
    pub hit_regions: Vec<HitRegion>,
}

impl RenderResult {
    pub fn control_at(&self, line: usize, column: u16) -> Option<&HitRegion> {
        self.hit_regions.iter().find(|region| {
            region.line == line && column >= region.start_column && column < region.end_column
        })
    }

    /// The document position closest to a screen cell, for mouse clicks.
    pub fn position_at(&self, line: usize, column: u16) -> Option<Position> {
        let on_line = self
            .click_map
            .iter()
            .filter(|(_, visual)| visual.line == line);
        let best = on_line
            .clone()
            .filter(|(_, visual)| visual.column <= column)
            .rev()
            .max_by_key(|(_, visual)| visual.column)
            .or_else(|| on_line.min_by_key(|(_, visual)| visual.column));
        match best {
            Some((position, _)) => Some(*position),
            None => self
                .click_map
                .iter()
                .filter(|(_, visual)| visual.line < line)
                .max_by_key(|(_, visual)| (visual.line, visual.column))
                .map(|(position, _)| *position),
        }
    }
}

pub fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

pub fn render_document(
    document: &Document,
    width: usize,
    selection: Option<(Position, Position)>,
    theme: &Theme,
) -> RenderResult {
    let mut renderer = Renderer::new(document, width.max(8), selection, theme);
    renderer.render_lines();
    renderer.finish()
}

#[derive(Clone, Copy)]
struct Cell {
    ch: char,
    style: Style,
}

struct Renderer<'a> {
    document: &'a Document,
    theme: &'a Theme,
    wrap_width: usize,
    selection: Option<(Position, Position)>,
    rows: Vec<Vec<Cell>>,
    row_width: usize,
    // A block just ended on the previous row; a following line break is
    // absorbed instead of opening another empty row.
    after_block: bool,
    cursor_map: Vec<(Position, CursorVisualPosition)>,
    click_map: Vec<(Position, CursorVisualPosition)>,
    hit_regions: Vec<HitRegion>,
}

impl<'a> Renderer<'a> {
    fn new(
        document: &'a Document,
        wrap_width: usize,
        selection: Option<(Position, Position)>,
        theme: &'a Theme,
    ) -> Self {
        Self {
            document,
            theme,
            wrap_width,
            selection,
            rows: vec![Vec::new()],
            row_width: 0,
            after_block: false,
            cursor_map: Vec::new(),
            click_map: Vec::new(),
            hit_regions: Vec::new(),
        }
    }

    fn render_lines(&mut self) {
        let document = self.document;
        let root = document.root();
        let base = self.theme.text_style();
        for (idx, line) in document.children(root).iter().enumerate() {
            if idx > 0 {
                self.start_row();
            }
            self.mark(Position::new(root, idx));
            self.after_block = false;
            self.render_children(*line, base);
        }
        self.mark(Position::new(root, document.children(root).len()));
    }

    fn render_children(&mut self, node: NodeId, style: Style) {
        let document = self.document;
        let children = document.children(node);
        for (idx, child) in children.iter().enumerate() {
            self.mark(Position::new(node, idx));
            self.render_node(*child, style);
        }
        self.mark(Position::new(node, children.len()));
    }

    fn render_node(&mut self, node: NodeId, style: Style) {
        let document = self.document;
        let Some(kind) = document.kind(node) else {
            return;
        };
        match kind {
            NodeKind::Text(text) => self.render_text(node, text, style),
            NodeKind::Strong => self.render_children(node, style.add_modifier(Modifier::BOLD)),
            NodeKind::Break => {
                if !self.after_block {
                    self.start_row();
                }
                self.after_block = false;
            }
            NodeKind::Fragment(fragment) => self.render_fragment(node, fragment),
            NodeKind::TextBlock(block) => {
                if self.row_width > 0 {
                    self.start_row();
                }
                let mut inner = style.fg(rgb(block.fg));
                if let Some(bg) = block.bg {
                    inner = inner.bg(rgb(bg));
                }
                self.render_children(node, inner);
                self.end_block();
            }
            NodeKind::Root | NodeKind::Line => self.render_children(node, style),
        }
    }

    fn render_text(&mut self, node: NodeId, text: &str, style: Style) {
        let chars: Vec<char> = text.chars().collect();
        let (sel_start, sel_end) = self.selected_chars(node, chars.len());
        let selected = self.theme.selection_style();

        let mut idx = 0;
        while idx < chars.len() {
            let is_space = chars[idx].is_whitespace();
            let token_end = chars[idx..]
                .iter()
                .position(|ch| ch.is_whitespace() != is_space)
                .map_or(chars.len(), |len| idx + len);
            if !is_space {
                let token_width: usize = chars[idx..token_end].iter().map(|c| char_width(*c)).sum();
                if self.row_width > 0 && self.row_width + token_width > self.wrap_width {
                    self.start_row();
                }
            }
            for (offset, ch) in chars.iter().enumerate().take(token_end).skip(idx) {
                let width = char_width(*ch);
                if self.row_width > 0 && self.row_width + width > self.wrap_width {
                    self.start_row();
                }
                self.mark_text(Position::new(node, offset));
                let cell_style = if offset >= sel_start && offset < sel_end {
                    style.patch(selected)
                } else {
                    style
                };
                self.push(*ch, cell_style);
            }
            idx = token_end;
        }
        self.mark_text(Position::new(node, chars.len()));
    }

    /// Character span of `node` inside the selection, as `[start, end)`.
    fn selected_chars(&self, node: NodeId, len: usize) -> (usize, usize) {
        let Some((start, end)) = self.selection else {
            return (0, 0);
        };
        let from = if start.node == node {
            start.offset
        } else if self.before(start, Position::new(node, 0)) {
            0
        } else {
            len
        };
        let to = if end.node == node {
            end.offset
        } else if self.before(Position::new(node, len), end) {
            len
        } else {
            0
        };
        (from, to)
    }

    fn before(&self, a: Position, b: Position) -> bool {
        matches!(
            self.document.compare_positions(a, b),
            Ok(Ordering::Less | Ordering::Equal)
        )
    }

    fn render_fragment(&mut self, node: NodeId, fragment: &Fragment) {
        if self.row_width > 0 {
            self.start_row();
        }
        let block = fragment.style();
        let mut body = Style::default().fg(rgb(block.fg));
        if let Some(bg) = block.bg {
            body = body.bg(rgb(bg));
        }
        let border = body.fg(rgb(block.border.unwrap_or(block.fg)));
        let inner = self.wrap_width.saturating_sub(4).max(1);

        self.push_str(&format!("┌{}┐", "─".repeat(inner + 2)), border);
        for text in wrap_plain(&fragment.body_text(), inner) {
            self.start_row();
            self.boxed_row(&text, inner, body, border);
        }

        let mut column = 0;
        self.start_row();
        self.push_str("│ ", border);
        for control in fragment.controls() {
            let label = format!("[ {} ]", control.label);
            let width = str_width(&label);
            if column > 0 && column + 1 + width > inner {
                self.close_row(inner - column, body, border);
                self.start_row();
                self.push_str("│ ", border);
                column = 0;
            }
            if column > 0 {
                self.push(' ', body);
                column += 1;
            }
            let start = self.row_width as u16;
            self.push_str(&label, self.theme.control_style());
            self.hit_regions.push(HitRegion {
                fragment: node,
                action: control.action.clone(),
                line: self.rows.len() - 1,
                start_column: start,
                end_column: self.row_width as u16,
            });
            column += width;
        }
        self.close_row(inner.saturating_sub(column), body, border);

        self.start_row();
        self.push_str(&format!("└{}┘", "─".repeat(inner + 2)), border);
        self.end_block();
    }

    fn boxed_row(&mut self, text: &str, inner: usize, body: Style, border: Style) {
        self.push_str("│ ", border);
        self.push_str(text, body);
        self.close_row(inner.saturating_sub(str_width(text)), body, border);
    }

    fn close_row(&mut self, padding: usize, body: Style, border: Style) {
        self.push_str(&" ".repeat(padding), body);
        self.push_str(" │", border);
    }

    fn end_block(&mut self) {
        self.start_row();
        self.after_block = true;
    }

    fn start_row(&mut self) {
        self.rows.push(Vec::new());
        self.row_width = 0;
    }

    fn push(&mut self, ch: char, style: Style) {
        self.after_block = false;
        self.row_width += char_width(ch);
        if let Some(row) = self.rows.last_mut() {
            row.push(Cell { ch, style });
        }
    }

    fn push_str(&mut self, text: &str, style: Style) {
        for ch in text.chars() {
            self.push(ch, style);
        }
    }

    fn mark(&mut self, position: Position) {
        let visual = CursorVisualPosition {
            line: self.rows.len() - 1,
            column: self.row_width as u16,
        };
        self.cursor_map.push((position, visual));
    }

    fn mark_text(&mut self, position: Position) {
        self.mark(position);
        if let Some(entry) = self.cursor_map.last().copied() {
            self.click_map.push(entry);
        }
    }

    fn finish(self) -> RenderResult {
        let caret = self.document.caret_position();
        let cursor = self
            .cursor_map
            .iter()
            .find(|(position, _)| *position == caret)
            .map(|(_, visual)| *visual);
        let lines: Vec<Line<'static>> = self.rows.into_iter().map(row_to_line).collect();
        RenderResult {
            total_lines: lines.len(),
            lines,
            cursor,
            cursor_map: self.cursor_map,
            click_map: self.click_map,
            hit_regions: self.hit_regions,
        }
    }
}

fn row_to_line(cells: Vec<Cell>) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut current = String::new();
    let mut current_style: Option<Style> = None;
    for cell in cells {
        if current_style.is_some_and(|style| style != cell.style) {
            spans.push(Span::styled(
                std::mem::take(&mut current),
                current_style.unwrap_or_default(),
            ));
        }
        current_style = Some(cell.style);
        current.push(cell.ch);
    }
    if let Some(style) = current_style {
        spans.push(Span::styled(current, style));
    }
    Line::from(spans)
}

fn wrap_plain(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = str_width(word) + usize::from(!current.is_empty());
        if !current.is_empty() && str_width(&current) + needed > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

fn str_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::BlockStyle;
    use crate::sanitize::{AmmoniaSanitizer, SanitizedMarkup};

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn renders_one_row_per_line() {
        let document = Document::from_lines(&["first", "second"]);
        let result = render_document(&document, 40, None, &Theme::default());
        let texts: Vec<String> = result.lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 0, column: 0 })
        );
    }

    #[test]
    fn long_lines_wrap_at_word_boundaries() {
        let document = Document::from_lines(&["alpha beta gamma"]);
        let result = render_document(&document, 11, None, &Theme::default());
        let texts: Vec<String> = result.lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["alpha beta ", "gamma"]);
    }

    #[test]
    fn selected_text_uses_selection_style() {
        let document = Document::from_lines(&["pick me"]);
        let line = document.children(document.root())[0];
        let text = document.children(line)[0];
        let theme = Theme::default();
        let selection = Some((Position::new(text, 5), Position::new(text, 7)));
        let result = render_document(&document, 40, selection, &theme);
        let last = result.lines[0].spans.last().unwrap();
        assert_eq!(last.content.as_ref(), "me");
        assert_eq!(last.style.bg, Some(theme.selection_bg));
    }

    #[test]
    fn fragment_controls_are_hit_regions() {
        let mut document = Document::from_lines(&["x"]);
        let markup = SanitizedMarkup::from_untrusted(
            r#"<button data-action="deleteSelectedText">Delete</button>"#,
            &AmmoniaSanitizer::new(),
        )
        .unwrap();
        let style = BlockStyle {
            fg: Rgb(200, 200, 200),
            bg: None,
            border: Some(Rgb(60, 60, 60)),
        };
        let fragment = document.create_node(NodeKind::Fragment(Box::new(Fragment::new(
            markup, style,
        ))));
        let line = document.children(document.root())[0];
        document.append_child(line, fragment).unwrap();

        let result = render_document(&document, 30, None, &Theme::default());
        let texts: Vec<String> = result.lines.iter().map(line_text).collect();
        assert_eq!(texts[0], "x");
        assert!(texts[1].starts_with('┌'));
        assert!(texts[2].contains("[ Delete ]"));
        assert!(texts[3].starts_with('└'));

        let region = &result.hit_regions[0];
        assert_eq!(region.action, "deleteSelectedText");
        assert_eq!(region.line, 2);
        assert_eq!(
            result.control_at(2, region.start_column).map(|r| r.fragment),
            Some(fragment)
        );
        assert!(result.control_at(2, 0).is_none());
    }

    #[test]
    fn clicks_map_back_to_positions() {
        let document = Document::from_lines(&["hello", "world"]);
        let result = render_document(&document, 40, None, &Theme::default());
        let second = document.children(document.children(document.root())[1])[0];
        assert_eq!(result.position_at(1, 3), Some(Position::new(second, 3)));
        assert_eq!(result.position_at(1, 99), Some(Position::new(second, 5)));
    }
}
