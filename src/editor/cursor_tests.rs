use super::*;

fn editor_with(lines: &[&str]) -> DocumentEditor {
    DocumentEditor::new(Document::from_lines(lines))
}

fn text_node(editor: &DocumentEditor, line: usize) -> NodeId {
    let document = editor.document();
    let line = document.children(document.root())[line];
    document.children(line)[0]
}

#[test]
fn move_right_crosses_into_next_line() {
    let mut editor = editor_with(&["ab", "cd"]);
    let first = text_node(&editor, 0);
    let second = text_node(&editor, 1);

    assert!(editor.move_right());
    assert!(editor.move_right());
    assert_eq!(editor.caret(), Position::new(first, 2));

    assert!(editor.move_right());
    assert_eq!(editor.caret(), Position::new(second, 0));
}

#[test]
fn move_left_stops_at_note_start() {
    let mut editor = editor_with(&["ab", "cd"]);
    let first = text_node(&editor, 0);
    let second = text_node(&editor, 1);
    editor
        .document_mut()
        .set_caret(Position::new(second, 0))
        .unwrap();

    assert!(editor.move_left());
    assert_eq!(editor.caret(), Position::new(first, 2));

    assert!(editor.move_left());
    assert!(editor.move_left());
    assert!(!editor.move_left());
    assert_eq!(editor.caret(), Position::new(first, 0));
}

#[test]
fn vertical_motion_keeps_the_column() {
    let mut editor = editor_with(&["hello", "hi", "world"]);
    let first = text_node(&editor, 0);
    let second = text_node(&editor, 1);
    let third = text_node(&editor, 2);
    editor
        .document_mut()
        .set_caret(Position::new(first, 4))
        .unwrap();

    assert!(editor.move_down());
    assert_eq!(editor.caret(), Position::new(second, 2));

    assert!(editor.move_down());
    assert_eq!(editor.caret(), Position::new(third, 2));

    assert!(!editor.move_down());
    assert!(editor.move_up());
    assert_eq!(editor.caret(), Position::new(second, 2));
}

#[test]
fn columns_span_several_text_segments() {
    let mut editor = editor_with(&["ab", "wxyz"]);
    let document = editor.document_mut();
    let first_line = document.children(document.root())[0];
    let strong = document.create_node(NodeKind::Strong);
    let bold = document.create_text("cd");
    document.append_child(strong, bold).unwrap();
    document.append_child(first_line, strong).unwrap();
    document.set_caret(Position::new(bold, 1)).unwrap();
    let second = text_node(&editor, 1);

    assert!(editor.move_down());
    assert_eq!(editor.caret(), Position::new(second, 3));

    assert!(editor.move_up());
    assert_eq!(editor.caret(), Position::new(bold, 1));
}

#[test]
fn line_start_and_end() {
    let mut editor = editor_with(&["hello"]);
    let text = text_node(&editor, 0);

    assert!(editor.move_to_line_end());
    assert_eq!(editor.caret(), Position::new(text, 5));

    assert!(editor.move_to_line_start());
    assert_eq!(editor.caret(), Position::new(text, 0));
}

#[test]
fn caret_between_elements_resolves_to_next_segment() {
    let mut editor = editor_with(&["ab", "cd"]);
    let root = editor.document().root();
    let second = text_node(&editor, 1);
    editor
        .document_mut()
        .set_caret(Position::new(root, 1))
        .unwrap();

    let segments = editor.segments();
    assert_eq!(editor.caret_segment(&segments), Some((1, 0)));

    assert!(editor.move_right());
    assert_eq!(editor.caret(), Position::new(second, 1));
}

#[test]
fn segments_follow_document_order() {
    let editor = editor_with(&["a", "bc"]);
    let segments = editor.segments();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].len, 1);
    assert_eq!(segments[1].len, 2);
    assert_ne!(segments[0].line, segments[1].line);
}
