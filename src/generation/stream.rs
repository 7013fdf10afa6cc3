use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::document::{Document, DocumentResult, NodeId, NodeKind};

pub const DEFAULT_CHAR_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealStep {
    Revealed(char),
    Finished,
}

/// Character-by-character reveal of text into a container node.
///
/// Each [`StreamReveal::tick`] appends exactly one character. Cancelling
/// stops further ticks and leaves what was already revealed in place.
#[derive(Debug)]
pub struct StreamReveal {
    container: NodeId,
    text: Vec<char>,
    revealed: usize,
    interval: Duration,
    cancel: CancellationToken,
}

impl StreamReveal {
    pub fn new(container: NodeId, text: &str, interval: Duration) -> Self {
        Self {
            container,
            text: text.chars().collect(),
            revealed: 0,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn revealed(&self) -> usize {
        self.revealed
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.revealed >= self.text.len() || self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn tick(&mut self, document: &mut Document) -> DocumentResult<RevealStep> {
        if self.is_finished() {
            return Ok(RevealStep::Finished);
        }
        let ch = self.text[self.revealed];
        let target = self.target_text(document)?;
        let mut buf = [0u8; 4];
        document.append_text(target, ch.encode_utf8(&mut buf))?;
        self.revealed += 1;
        Ok(RevealStep::Revealed(ch))
    }

    fn target_text(&self, document: &mut Document) -> DocumentResult<NodeId> {
        if let Some(last) = document.children(self.container).last().copied() {
            if matches!(document.kind(last), Some(NodeKind::Text(_))) {
                return Ok(last);
            }
        }
        let text = document.create_text("");
        document.append_child(self.container, text)?;
        Ok(text)
    }

    /// Reveal everything, pausing `interval` before each tick. Returns the
    /// number of characters revealed.
    pub async fn run(mut self, document: &mut Document) -> DocumentResult<usize> {
        let token = self.cancellation_token();
        loop {
            pace(self.interval, &token).await;
            if let RevealStep::Finished = self.tick(document)? {
                return Ok(self.revealed);
            }
        }
    }
}

/// Yield to the runtime for one reveal interval, or until cancelled.
pub async fn pace(interval: Duration, token: &CancellationToken) {
    if interval.is_zero() {
        tokio::task::yield_now().await;
        return;
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => {}
        _ = tokio::time::sleep(interval) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockStyle, Rgb};

    fn container_document() -> (Document, NodeId) {
        let mut document = Document::from_lines(&["before"]);
        let line = document.children(document.root())[0];
        let container = document.create_node(NodeKind::TextBlock(BlockStyle {
            fg: Rgb(1, 2, 3),
            bg: None,
            border: None,
        }));
        document.append_child(line, container).unwrap();
        (document, container)
    }

    #[test]
    fn each_tick_appends_one_character() {
        let (mut document, container) = container_document();
        let text = "héllo, wörld";
        let mut reveal = StreamReveal::new(container, text, DEFAULT_CHAR_INTERVAL);

        let mut ticks = 0;
        let mut previous_len = 0;
        while let RevealStep::Revealed(_) = reveal.tick(&mut document).unwrap() {
            ticks += 1;
            let current = document.text_content(container).chars().count();
            assert_eq!(current, previous_len + 1);
            previous_len = current;
        }
        assert_eq!(ticks, text.chars().count());
        assert_eq!(document.text_content(container), text);
        assert_eq!(reveal.tick(&mut document).unwrap(), RevealStep::Finished);
    }

    #[test]
    fn empty_text_finishes_immediately() {
        let (mut document, container) = container_document();
        let mut reveal = StreamReveal::new(container, "", DEFAULT_CHAR_INTERVAL);
        assert!(reveal.is_empty());
        assert_eq!(reveal.tick(&mut document).unwrap(), RevealStep::Finished);
        assert_eq!(document.text_content(container), "");
    }

    #[test]
    fn cancel_keeps_partial_text() {
        let (mut document, container) = container_document();
        let mut reveal = StreamReveal::new(container, "abcdef", DEFAULT_CHAR_INTERVAL);
        reveal.tick(&mut document).unwrap();
        reveal.tick(&mut document).unwrap();
        reveal.cancel();
        assert_eq!(reveal.tick(&mut document).unwrap(), RevealStep::Finished);
        assert_eq!(document.text_content(container), "ab");
    }

    #[tokio::test(start_paused = true)]
    async fn run_reveals_everything_on_the_timer() {
        let (mut document, container) = container_document();
        let reveal = StreamReveal::new(container, "Why did...", DEFAULT_CHAR_INTERVAL);
        let started = tokio::time::Instant::now();
        let revealed = reveal.run(&mut document).await.unwrap();
        assert_eq!(revealed, 10);
        assert_eq!(document.text_content(container), "Why did...");
        assert!(started.elapsed() >= DEFAULT_CHAR_INTERVAL * 10);
    }
}
