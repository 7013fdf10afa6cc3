//! Replacing an anchored span with generated content.

use tracing::{debug, info};

use crate::document::{BlockStyle, Document, DocumentResult, NodeId, NodeKind, Position, RangeId, Rgb};
use crate::editor::SelectionAnchor;
use crate::fragment::{ActionBinding, Fragment, FragmentAction};
use crate::sanitize::SanitizedMarkup;

/// Boxed look for interactive fragments.
pub const FRAGMENT_STYLE: BlockStyle = BlockStyle {
    fg: Rgb(0xad, 0xba, 0xc7),
    bg: Some(Rgb(0x2d, 0x33, 0x3b)),
    border: Some(Rgb(0x44, 0x4c, 0x56)),
};

/// Plain look for streamed text.
pub const TEXT_BLOCK_STYLE: BlockStyle = BlockStyle {
    fg: Rgb(0xad, 0xba, 0xc7),
    bg: None,
    border: None,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplicedBlock {
    pub container: NodeId,
    pub line_break: NodeId,
}

/// Replace the anchor's span with a non-editable fragment followed by a line
/// break. The anchor's range is re-pointed to cover exactly the fragment and
/// the break, and the fragment's actions are bound to it.
pub fn splice_ui_fragment(
    document: &mut Document,
    anchor: &SelectionAnchor,
    markup: SanitizedMarkup,
) -> DocumentResult<SplicedBlock> {
    let mut fragment = Fragment::new(markup, FRAGMENT_STYLE);
    fragment.bind(ActionBinding {
        range: anchor.range,
        anchor_text: anchor.text.clone(),
    });
    let container = document.create_node(NodeKind::Fragment(Box::new(fragment)));
    let spliced = replace_with_block(document, anchor.range, container)?;
    info!(
        fragment = ?spliced.container,
        controls = document.fragment(container).map_or(0, |f| f.controls().len()),
        "inserted interactive fragment"
    );
    Ok(spliced)
}

/// Replace the anchor's span with an empty text container followed by a
/// line break, ready to be filled by a stream reveal.
pub fn splice_text_container(
    document: &mut Document,
    anchor: &SelectionAnchor,
) -> DocumentResult<SplicedBlock> {
    let container = document.create_node(NodeKind::TextBlock(TEXT_BLOCK_STYLE));
    replace_with_block(document, anchor.range, container)
}

fn replace_with_block(
    document: &mut Document,
    range: RangeId,
    container: NodeId,
) -> DocumentResult<SplicedBlock> {
    document.delete_range_contents(range)?;
    let (point, _) = document.range_bounds(range)?;
    let after_container = document.insert_at(point, container)?;

    let line_break = document.create_node(NodeKind::Break);
    document.insert_child(after_container.node, after_container.offset, line_break)?;

    let before_container = Position::new(after_container.node, after_container.offset - 1);
    let after_break = Position::new(after_container.node, after_container.offset + 1);
    document.set_range(range, before_container, after_break)?;
    document.set_caret(after_break)?;
    debug!(?container, ?line_break, "spliced block at anchor");
    Ok(SplicedBlock {
        container,
        line_break,
    })
}

/// Route a click inside `fragment` to its bound action.
///
/// Returns the action that ran, or `None` when the click hit no recognised
/// control or the fragment's binding was already used.
pub fn dispatch_fragment_click(
    document: &mut Document,
    fragment: NodeId,
    action: Option<&str>,
) -> DocumentResult<Option<FragmentAction>> {
    let Some(action) = action.and_then(|name| name.parse::<FragmentAction>().ok()) else {
        return Ok(None);
    };
    let Some(range) = document
        .fragment(fragment)
        .and_then(Fragment::binding)
        .map(|binding| binding.range)
    else {
        debug!(?fragment, %action, "click on fragment without binding");
        return Ok(None);
    };
    if document.range_is_collapsed(range)? {
        debug!(?fragment, %action, "bound range is empty, action skipped");
        return Ok(None);
    }
    let Some(binding) = document
        .fragment_mut(fragment)
        .and_then(Fragment::take_binding)
    else {
        return Ok(None);
    };

    let result = apply_action(document, action, &binding);
    document.release_range(binding.range);
    result?;
    info!(?fragment, %action, "fragment action applied");
    Ok(Some(action))
}

fn apply_action(
    document: &mut Document,
    action: FragmentAction,
    binding: &ActionBinding,
) -> DocumentResult<()> {
    document.delete_range_contents(binding.range)?;
    match action {
        FragmentAction::DeleteSelectedText => Ok(()),
        FragmentAction::WrapWithBold => {
            let strong = document.create_node(NodeKind::Strong);
            let text = document.create_text(&binding.anchor_text);
            document.append_child(strong, text)?;
            document.insert_node_at_range(binding.range, strong)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::AmmoniaSanitizer;

    fn anchored(document: &mut Document, line: usize, start: usize, end: usize) -> SelectionAnchor {
        let line = document.children(document.root())[line];
        let text = document.children(line)[0];
        let range = document
            .create_range(Position::new(text, start), Position::new(text, end))
            .unwrap();
        let text = document.range_text(range).unwrap();
        SelectionAnchor { range, text }
    }

    fn markup(raw: &str) -> SanitizedMarkup {
        SanitizedMarkup::from_untrusted(raw, &AmmoniaSanitizer::new()).unwrap()
    }

    #[test]
    fn ui_splice_replaces_span_with_fragment_and_break() {
        let mut document = Document::from_lines(&["please make a button", "after"]);
        let anchor = anchored(&mut document, 0, 7, 20);
        let spliced = splice_ui_fragment(
            &mut document,
            &anchor,
            markup(r#"<button data-action="deleteSelectedText">Delete</button>"#),
        )
        .unwrap();

        let line = document.children(document.root())[0];
        let children = document.children(line).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(children[1], spliced.container);
        assert_eq!(children[2], spliced.line_break);
        assert_eq!(document.text_content(children[0]), "please ");

        let (start, end) = document.range_bounds(anchor.range).unwrap();
        assert_eq!(start, Position::new(line, 1));
        assert_eq!(end, Position::new(line, 3));
        assert_eq!(document.caret_position(), Position::new(line, 3));

        let binding = document.fragment(spliced.container).unwrap().binding().unwrap();
        assert_eq!(binding.range, anchor.range);
        assert_eq!(binding.anchor_text, "make a button");
    }

    #[test]
    fn text_splice_leaves_empty_container() {
        let mut document = Document::from_lines(&["tell me a joke"]);
        let anchor = anchored(&mut document, 0, 0, 14);
        let spliced = splice_text_container(&mut document, &anchor).unwrap();

        assert_eq!(document.text_content(spliced.container), "");
        assert!(matches!(
            document.kind(spliced.container),
            Some(NodeKind::TextBlock(style)) if *style == TEXT_BLOCK_STYLE
        ));
        assert_eq!(document.plain_text(), "\n");
    }

    #[test]
    fn delete_action_removes_fragment_and_keeps_neighbours() {
        let mut document = Document::from_lines(&["please make a button", "after"]);
        let anchor = anchored(&mut document, 0, 7, 20);
        let spliced = splice_ui_fragment(
            &mut document,
            &anchor,
            markup(r#"<button data-action="deleteSelectedText">Delete</button>"#),
        )
        .unwrap();
        let ranges_before = document.range_count();

        let action =
            dispatch_fragment_click(&mut document, spliced.container, Some("deleteSelectedText"))
                .unwrap();

        assert_eq!(action, Some(FragmentAction::DeleteSelectedText));
        assert_eq!(document.plain_text(), "please \nafter");
        assert!(!document.is_attached(spliced.container));
        assert_eq!(document.range_count(), ranges_before - 1);
    }

    #[test]
    fn bold_action_wraps_original_text() {
        let mut document = Document::from_lines(&["x make bold y"]);
        let anchor = anchored(&mut document, 0, 2, 11);
        let spliced = splice_ui_fragment(
            &mut document,
            &anchor,
            markup(r#"<button data-action="wrapWithBold">Bold</button>"#),
        )
        .unwrap();

        dispatch_fragment_click(&mut document, spliced.container, Some("wrapWithBold")).unwrap();

        assert_eq!(document.markup(), "<div>x <strong>make bold</strong> y</div>");
    }

    #[test]
    fn binding_is_one_shot() {
        let mut document = Document::from_lines(&["abc"]);
        let anchor = anchored(&mut document, 0, 0, 3);
        let spliced = splice_ui_fragment(
            &mut document,
            &anchor,
            markup(r#"<button data-action="wrapWithBold">B</button>"#),
        )
        .unwrap();

        assert!(
            dispatch_fragment_click(&mut document, spliced.container, Some("wrapWithBold"))
                .unwrap()
                .is_some()
        );
        assert_eq!(
            dispatch_fragment_click(&mut document, spliced.container, Some("wrapWithBold"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn unknown_action_is_ignored() {
        let mut document = Document::from_lines(&["abc"]);
        let anchor = anchored(&mut document, 0, 0, 3);
        let spliced = splice_ui_fragment(
            &mut document,
            &anchor,
            markup(r#"<button data-action="launchRockets">Go</button>"#),
        )
        .unwrap();

        for action in [Some("launchRockets"), None] {
            assert_eq!(
                dispatch_fragment_click(&mut document, spliced.container, action).unwrap(),
                None
            );
        }
        assert!(document.is_attached(spliced.container));
        assert!(document.fragment(spliced.container).unwrap().binding().is_some());
    }
}
