use std::cmp::Ordering;

use super::{DocumentEditor, SegmentRef};
use crate::document::Position;

impl DocumentEditor {
    /// Index of the segment holding the caret, with the caret offset inside
    /// it. A caret on an element boundary resolves to the next segment start,
    /// or the end of the last segment before it.
    pub(crate) fn caret_segment(&self, segments: &[SegmentRef]) -> Option<(usize, usize)> {
        let caret = self.caret();
        if let Some(index) = segments.iter().position(|s| s.node == caret.node) {
            return Some((index, caret.offset.min(segments[index].len)));
        }
        let document = self.document();
        let mut previous = None;
        for (index, segment) in segments.iter().enumerate() {
            let start = Position::new(segment.node, 0);
            match document.compare_positions(start, caret).ok()? {
                Ordering::Less => previous = Some((index, segment.len)),
                _ => return Some((index, 0)),
            }
        }
        previous
    }

    fn move_caret_to(&mut self, position: Position) -> bool {
        self.document_mut().set_caret(position).is_ok()
    }

    pub fn move_left(&mut self) -> bool {
        let segments = self.segments();
        let Some((index, offset)) = self.caret_segment(&segments) else {
            return false;
        };
        if offset > 0 {
            return self.move_caret_to(Position::new(segments[index].node, offset - 1));
        }
        if index == 0 {
            return false;
        }
        let previous = &segments[index - 1];
        self.move_caret_to(Position::new(previous.node, previous.len))
    }

    pub fn move_right(&mut self) -> bool {
        let segments = self.segments();
        let Some((index, offset)) = self.caret_segment(&segments) else {
            return false;
        };
        if offset < segments[index].len {
            return self.move_caret_to(Position::new(segments[index].node, offset + 1));
        }
        match segments.get(index + 1) {
            Some(next) => self.move_caret_to(Position::new(next.node, 0)),
            None => false,
        }
    }

    pub fn move_up(&mut self) -> bool {
        self.move_vertical(false)
    }

    pub fn move_down(&mut self) -> bool {
        self.move_vertical(true)
    }

    fn move_vertical(&mut self, downward: bool) -> bool {
        let segments = self.segments();
        let Some((index, offset)) = self.caret_segment(&segments) else {
            return false;
        };
        let current_line = segments[index].line;
        let column = self.column_in_line(&segments, index, offset);

        let target_line = if downward {
            segments[index..]
                .iter()
                .find(|segment| segment.line != current_line)
                .map(|segment| segment.line)
        } else {
            segments[..index]
                .iter()
                .rev()
                .find(|segment| segment.line != current_line)
                .map(|segment| segment.line)
        };
        let Some(target_line) = target_line else {
            return false;
        };
        self.move_to_column(&segments, target_line, column)
    }

    fn column_in_line(&self, segments: &[SegmentRef], index: usize, offset: usize) -> usize {
        let line = segments[index].line;
        segments[..index]
            .iter()
            .filter(|segment| segment.line == line)
            .map(|segment| segment.len)
            .sum::<usize>()
            + offset
    }

    fn move_to_column(
        &mut self,
        segments: &[SegmentRef],
        line: crate::document::NodeId,
        column: usize,
    ) -> bool {
        let mut remaining = column;
        let mut last = None;
        for segment in segments.iter().filter(|segment| segment.line == line) {
            if remaining <= segment.len {
                return self.move_caret_to(Position::new(segment.node, remaining));
            }
            remaining -= segment.len;
            last = Some(Position::new(segment.node, segment.len));
        }
        match last {
            Some(position) => self.move_caret_to(position),
            None => false,
        }
    }

    pub fn move_to_line_start(&mut self) -> bool {
        let segments = self.segments();
        let Some((index, _)) = self.caret_segment(&segments) else {
            return false;
        };
        self.move_to_column(&segments, segments[index].line, 0)
    }

    pub fn move_to_line_end(&mut self) -> bool {
        let segments = self.segments();
        let Some((index, _)) = self.caret_segment(&segments) else {
            return false;
        };
        self.move_to_column(&segments, segments[index].line, usize::MAX)
    }
}
