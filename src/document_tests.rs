use super::*;

use std::cmp::Ordering;

fn line(document: &Document, index: usize) -> NodeId {
    document.children(document.root())[index]
}

fn text_of_line(document: &Document, index: usize) -> NodeId {
    document.children(line(document, index))[0]
}

#[test]
fn from_lines_puts_caret_on_first_text() {
    let document = Document::from_lines(&["alpha", "beta"]);
    let first = text_of_line(&document, 0);
    assert_eq!(document.caret_position(), Position::new(first, 0));
    assert_eq!(document.plain_text(), "alpha\nbeta");
    assert_eq!(document.range_count(), 1);
}

#[test]
fn insert_text_shifts_later_boundaries() {
    let mut document = Document::from_lines(&["hello world"]);
    let text = text_of_line(&document, 0);
    let range = document
        .create_range(Position::new(text, 6), Position::new(text, 11))
        .unwrap();

    document.insert_text(text, 0, "oh ").unwrap();

    assert_eq!(
        document.range_bounds(range).unwrap(),
        (Position::new(text, 9), Position::new(text, 14))
    );
    assert_eq!(document.range_text(range).unwrap(), "world");
    // A boundary sitting exactly at the insertion point stays put.
    assert_eq!(document.caret_position(), Position::new(text, 0));
}

#[test]
fn delete_text_clamps_boundaries_inside_the_hole() {
    let mut document = Document::from_lines(&["hello world"]);
    let text = text_of_line(&document, 0);
    let range = document
        .create_range(Position::new(text, 6), Position::new(text, 11))
        .unwrap();

    document.delete_text(text, 4, 4).unwrap();

    assert_eq!(document.plain_text(), "hellrld");
    assert_eq!(
        document.range_bounds(range).unwrap(),
        (Position::new(text, 4), Position::new(text, 7))
    );
    assert_eq!(document.range_text(range).unwrap(), "rld");
}

#[test]
fn split_text_moves_trailing_boundaries_into_the_tail() {
    let mut document = Document::from_lines(&["hello world"]);
    let text = text_of_line(&document, 0);
    let range = document
        .create_range(Position::new(text, 8), Position::new(text, 11))
        .unwrap();

    let tail = document.split_text(text, 6).unwrap();

    assert_eq!(document.children(line(&document, 0)), &[text, tail]);
    assert_eq!(
        document.range_bounds(range).unwrap(),
        (Position::new(tail, 2), Position::new(tail, 5))
    );
    assert_eq!(document.range_text(range).unwrap(), "rld");
    assert_eq!(document.plain_text(), "hello world");
}

#[test]
fn delete_range_contents_within_one_text_node() {
    let mut document = Document::from_lines(&["hello world"]);
    let text = text_of_line(&document, 0);
    let range = document
        .create_range(Position::new(text, 0), Position::new(text, 6))
        .unwrap();

    document.delete_range_contents(range).unwrap();

    assert_eq!(document.plain_text(), "world");
    assert!(document.range_is_collapsed(range).unwrap());
}

#[test]
fn delete_range_contents_across_lines() {
    let mut document = Document::from_lines(&["first", "second", "third"]);
    let first = text_of_line(&document, 0);
    let middle = line(&document, 1);
    let third = text_of_line(&document, 2);
    let range = document
        .create_range(Position::new(first, 2), Position::new(third, 3))
        .unwrap();
    assert_eq!(document.range_text(range).unwrap(), "rstsecondthi");

    document.delete_range_contents(range).unwrap();

    assert_eq!(document.plain_text(), "fi\nrd");
    assert!(!document.is_attached(middle));
    assert_eq!(
        document.range_bounds(range).unwrap(),
        (
            Position::new(document.root(), 1),
            Position::new(document.root(), 1)
        )
    );
}

#[test]
fn removing_a_node_collapses_points_inside_it() {
    let mut document = Document::from_lines(&["a", "b"]);
    let second = line(&document, 1);
    let text = text_of_line(&document, 1);
    let range = document
        .create_range(Position::new(text, 0), Position::new(text, 1))
        .unwrap();

    document.remove_node(second).unwrap();

    assert_eq!(
        document.range_bounds(range).unwrap(),
        (
            Position::new(document.root(), 1),
            Position::new(document.root(), 1)
        )
    );
    assert_eq!(document.plain_text(), "a");
}

#[test]
fn moving_children_carries_boundaries_along() {
    let mut document = Document::from_lines(&["ab", "cd"]);
    let first = line(&document, 0);
    let second = line(&document, 1);
    let a = text_of_line(&document, 0);
    let c = text_of_line(&document, 1);
    let b = document.split_text(a, 1).unwrap();
    let spanning = document
        .create_range(Position::new(first, 1), Position::new(first, 2))
        .unwrap();
    let inside = document
        .create_range(Position::new(b, 0), Position::new(b, 1))
        .unwrap();
    let collapsed = document
        .create_range(Position::new(first, 1), Position::new(first, 1))
        .unwrap();
    let after_c = document
        .create_range(Position::new(second, 1), Position::new(second, 1))
        .unwrap();

    document.move_children(first, 1, second, 0).unwrap();

    assert_eq!(document.children(second).to_vec(), vec![b, c]);
    assert_eq!(document.plain_text(), "a\nbcd");
    assert_eq!(
        document.range_bounds(spanning).unwrap(),
        (Position::new(second, 0), Position::new(second, 1))
    );
    assert_eq!(
        document.range_bounds(inside).unwrap(),
        (Position::new(b, 0), Position::new(b, 1))
    );
    assert_eq!(
        document.range_bounds(collapsed).unwrap(),
        (Position::new(first, 1), Position::new(first, 1))
    );
    assert_eq!(
        document.range_bounds(after_c).unwrap(),
        (Position::new(second, 2), Position::new(second, 2))
    );
}

#[test]
fn moving_all_children_takes_every_point_along() {
    let mut document = Document::from_lines(&["ab", "cd"]);
    let first = line(&document, 0);
    let second = line(&document, 1);
    let at_start = document
        .create_range(Position::new(second, 0), Position::new(second, 0))
        .unwrap();

    document.move_children(second, 0, first, 1).unwrap();

    assert!(document.children(second).is_empty());
    assert_eq!(
        document.range_bounds(at_start).unwrap(),
        (Position::new(first, 1), Position::new(first, 1))
    );
}

#[test]
fn children_cannot_move_into_themselves() {
    let mut document = Document::from_lines(&["ab"]);
    let root = document.root();
    let first = line(&document, 0);
    assert!(document.move_children(root, 0, first, 0).is_err());
    assert!(document.move_children(first, 2, root, 0).is_err());
    assert_eq!(document.plain_text(), "ab");
}

#[test]
fn insert_node_at_collapsed_range_grows_over_it() {
    let mut document = Document::from_lines(&["ab"]);
    let text = text_of_line(&document, 0);
    let range = document
        .create_range(Position::new(text, 1), Position::new(text, 1))
        .unwrap();
    let strong = document.create_node(NodeKind::Strong);
    let inner = document.create_text("X");
    document.append_child(strong, inner).unwrap();

    document.insert_node_at_range(range, strong).unwrap();

    assert_eq!(document.markup(), "<div>a<strong>X</strong>b</div>");
    assert_eq!(document.range_text(range).unwrap(), "X");
}

#[test]
fn insert_at_returns_point_after_node() {
    let mut document = Document::from_lines(&["abcd"]);
    let text = text_of_line(&document, 0);
    let br = document.create_node(NodeKind::Break);

    let after = document.insert_at(Position::new(text, 2), br).unwrap();

    let row = line(&document, 0);
    assert_eq!(after, Position::new(row, 2));
    assert_eq!(document.children(row)[1], br);
    assert_eq!(document.plain_text(), "ab\ncd");
    assert_eq!(document.markup(), "<div>ab<br>cd</div>");
}

#[test]
fn positions_compare_in_tree_order() {
    let document = Document::from_lines(&["one", "two"]);
    let root = document.root();
    let first_line = line(&document, 0);
    let first = text_of_line(&document, 0);
    let second = text_of_line(&document, 1);

    let cmp = |a, b| document.compare_positions(a, b).unwrap();
    assert_eq!(cmp(Position::new(root, 0), Position::new(first, 0)), Ordering::Less);
    assert_eq!(cmp(Position::new(first, 3), Position::new(second, 0)), Ordering::Less);
    assert_eq!(
        cmp(Position::new(first_line, 1), Position::new(first, 3)),
        Ordering::Greater
    );
    assert_eq!(cmp(Position::new(second, 1), Position::new(second, 1)), Ordering::Equal);
}

#[test]
fn create_range_orders_its_bounds() {
    let mut document = Document::from_lines(&["hello"]);
    let text = text_of_line(&document, 0);
    let range = document
        .create_range(Position::new(text, 4), Position::new(text, 1))
        .unwrap();
    assert_eq!(document.range_text(range).unwrap(), "ell");
}

#[test]
fn out_of_bounds_offsets_are_rejected() {
    let mut document = Document::from_lines(&["hi"]);
    let text = text_of_line(&document, 0);
    let err = document
        .create_range(Position::new(text, 9), Position::new(text, 9))
        .unwrap_err();
    assert!(matches!(err, DocumentError::OffsetOutOfBounds { offset: 9, .. }));
    assert!(document.insert_text(text, 3, "x").is_err());
}

#[test]
fn released_ranges_report_an_error_and_free_their_slot() {
    let mut document = Document::from_lines(&["hi"]);
    let text = text_of_line(&document, 0);
    let range = document
        .create_range(Position::new(text, 0), Position::new(text, 2))
        .unwrap();
    assert_eq!(document.range_count(), 2);

    document.release_range(range);

    assert_eq!(document.range_count(), 1);
    assert!(matches!(
        document.range_bounds(range),
        Err(DocumentError::ReleasedRange(id)) if id == range
    ));
    let reused = document
        .create_range(Position::new(text, 1), Position::new(text, 1))
        .unwrap();
    assert_eq!(reused, range);
}

#[test]
fn caret_cannot_be_released() {
    let mut document = Document::from_lines(&["hi"]);
    document.release_range(document.caret());
    assert_eq!(document.range_count(), 1);
}

#[test]
fn invalid_insertions_are_rejected() {
    let mut document = Document::from_lines(&["a"]);
    let row = line(&document, 0);
    let text = text_of_line(&document, 0);
    let fresh = document.create_text("b");

    assert!(matches!(
        document.append_child(text, fresh),
        Err(DocumentError::NotAContainer(_))
    ));
    assert!(matches!(
        document.append_child(row, text),
        Err(DocumentError::InvalidInsertion(_))
    ));
    let root = document.root();
    assert!(matches!(
        document.append_child(row, root),
        Err(DocumentError::InvalidInsertion(_))
    ));
}

#[test]
fn set_start_after_moves_start_past_node() {
    let mut document = Document::from_lines(&["a", "b"]);
    let first = line(&document, 0);
    let second_text = text_of_line(&document, 1);
    let range = document
        .create_range(Position::new(document.root(), 0), Position::new(second_text, 1))
        .unwrap();

    document.set_start_after(range, first).unwrap();

    assert_eq!(
        document.range_bounds(range).unwrap().0,
        Position::new(document.root(), 1)
    );
    assert_eq!(document.range_text(range).unwrap(), "b");
}

#[test]
fn markup_escapes_text() {
    let document = Document::from_lines(&["a < b & c"]);
    assert_eq!(document.markup(), "<div>a &lt; b &amp; c</div>");
}

#[test]
fn detached_nodes_are_not_attached() {
    let mut document = Document::from_lines(&["a"]);
    let loose = document.create_text("x");
    assert!(!document.is_attached(loose));
    assert!(document.set_caret(Position::new(loose, 0)).is_err());
    assert_eq!(document.first_text_node(), Some(text_of_line(&document, 0)));
}
