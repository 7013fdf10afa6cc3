//! Seeding a note from an FTML or Markdown file.
//!
//! Structure is flattened to lines: headers, quotes and list entries each
//! become their own line, bold spans become strong runs and every other
//! inline style keeps only its text.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use tdoc::{ChecklistItem, InlineStyle, Paragraph, ParagraphType, Span, markdown};
use thiserror::Error;
use tracing::{info, warn};

use crate::document::{Document, DocumentResult, NodeId, NodeKind, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Ftml,
    Markdown,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("md") | Some("markdown") | Some("mkd") | Some("mdown") | Some("mdtxt") => {
                DocumentFormat::Markdown
            }
            _ => DocumentFormat::Ftml,
        }
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ImportError(String);

pub fn parse_source(content: &str, format: DocumentFormat) -> Result<Document, ImportError> {
    let parsed = match format {
        DocumentFormat::Ftml => {
            tdoc::parse(Cursor::new(content)).map_err(|err| ImportError(err.to_string()))?
        }
        DocumentFormat::Markdown => {
            markdown::parse(Cursor::new(content)).map_err(|err| ImportError(err.to_string()))?
        }
    };
    from_tdoc(&parsed).map_err(|err| ImportError(err.to_string()))
}

/// Load `path` as the initial note, with a status message for the host.
/// A missing or unparsable file yields an empty note instead of an error.
pub fn load_note(path: &Path) -> std::io::Result<(Document, Option<String>)> {
    if !path.exists() {
        return Ok((Document::new(), Some("New note".to_string())));
    }
    let content = fs::read_to_string(path)?;
    let format = DocumentFormat::from_path(path);
    match parse_source(&content, format) {
        Ok(document) => {
            info!(path = %path.display(), ?format, "loaded note");
            Ok((document, None))
        }
        Err(err) => {
            warn!(%err, path = %path.display(), "note could not be parsed");
            let message = format!("Parse error: {err}. Starting with empty note.");
            Ok((Document::new(), Some(message)))
        }
    }
}

pub fn from_tdoc(source: &tdoc::Document) -> DocumentResult<Document> {
    let mut builder = LineBuilder {
        document: Document::from_lines(&[]),
    };
    for paragraph in &source.paragraphs {
        builder.paragraph(paragraph, "")?;
    }
    if builder.document.children(builder.document.root()).is_empty() {
        builder.document.push_line("");
    }
    if let Some(text) = builder.document.first_text_node() {
        builder.document.set_caret(Position::new(text, 0))?;
    }
    Ok(builder.document)
}

struct LineBuilder {
    document: Document,
}

impl LineBuilder {
    fn paragraph(&mut self, paragraph: &Paragraph, prefix: &str) -> DocumentResult<()> {
        match paragraph.paragraph_type() {
            ParagraphType::UnorderedList => {
                for entry in paragraph.entries() {
                    self.entry(entry, &format!("{prefix}• "))?;
                }
            }
            ParagraphType::OrderedList => {
                for (idx, entry) in paragraph.entries().iter().enumerate() {
                    self.entry(entry, &format!("{prefix}{}. ", idx + 1))?;
                }
            }
            ParagraphType::Checklist => {
                for item in paragraph.checklist_items() {
                    self.checklist_item(item, prefix)?;
                }
            }
            ParagraphType::Quote => {
                if !paragraph.content().is_empty() {
                    self.line(paragraph.content(), &format!("{prefix}> "))?;
                }
                for child in paragraph.children() {
                    self.paragraph(child, &format!("{prefix}> "))?;
                }
            }
            _ => self.line(paragraph.content(), prefix)?,
        }
        Ok(())
    }

    fn entry(&mut self, entry: &[Paragraph], prefix: &str) -> DocumentResult<()> {
        let indent = " ".repeat(prefix.chars().count());
        for (idx, paragraph) in entry.iter().enumerate() {
            self.paragraph(paragraph, if idx == 0 { prefix } else { &indent })?;
        }
        Ok(())
    }

    fn checklist_item(&mut self, item: &ChecklistItem, prefix: &str) -> DocumentResult<()> {
        let marker = if item.checked { "[x] " } else { "[ ] " };
        self.line(&item.content, &format!("{prefix}{marker}"))?;
        let nested = format!("{prefix}    ");
        for child in &item.children {
            self.checklist_item(child, &nested)?;
        }
        Ok(())
    }

    fn line(&mut self, spans: &[Span], prefix: &str) -> DocumentResult<()> {
        let line = self.document.create_node(NodeKind::Line);
        let root = self.document.root();
        self.document.append_child(root, line)?;
        if !prefix.is_empty() {
            let text = self.document.create_text(prefix);
            self.document.append_child(line, text)?;
        }
        for span in spans {
            self.span(span, line)?;
        }
        if self.document.children(line).is_empty() {
            let text = self.document.create_text("");
            self.document.append_child(line, text)?;
        }
        Ok(())
    }

    fn span(&mut self, span: &Span, parent: NodeId) -> DocumentResult<()> {
        let target = if matches!(span.style, InlineStyle::Bold) {
            let strong = self.document.create_node(NodeKind::Strong);
            self.document.append_child(parent, strong)?;
            strong
        } else {
            parent
        };
        if !span.text.is_empty() {
            self.text(&span.text, target)?;
        }
        for child in &span.children {
            self.span(child, target)?;
        }
        Ok(())
    }

    // Hard line breaks inside a span become break nodes.
    fn text(&mut self, text: &str, parent: NodeId) -> DocumentResult<()> {
        for (idx, piece) in text.split('\n').enumerate() {
            if idx > 0 {
                let br = self.document.create_node(NodeKind::Break);
                self.document.append_child(parent, br)?;
            }
            if piece.is_empty() {
                continue;
            }
            let last_text = self
                .document
                .children(parent)
                .last()
                .copied()
                .filter(|id| matches!(self.document.kind(*id), Some(NodeKind::Text(_))));
            match last_text {
                Some(id) => self.document.append_text(id, piece)?,
                None => {
                    let node = self.document.create_text(piece);
                    self.document.append_child(parent, node)?;
                }
            }
        }
        Ok(())
    }
}
