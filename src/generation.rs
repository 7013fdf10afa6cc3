//! The generation cycle: capture an anchor, ask the provider, classify the
//! reply and splice it into the note.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::document::{Document, NodeId, Position};
use crate::editor::{DocumentEditor, SelectionAnchor};
use crate::error::GenerationError;
use crate::fragment::FragmentAction;
use crate::provider::ContentProvider;
use crate::sanitize::{AmmoniaSanitizer, SanitizedMarkup, Sanitizer};
use crate::splice::{dispatch_fragment_click, splice_text_container, splice_ui_fragment};

mod classify;
mod prompt;
mod stream;

pub use classify::{
    ClassificationMode, ClassifiedResponse, TEXT_MARKER, UI_MARKER, classify, classify_strict,
    classify_with,
};
pub use prompt::build_prompt;
pub use stream::{DEFAULT_CHAR_INTERVAL, RevealStep, StreamReveal, pace};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Delay between revealed characters of a text reply.
    pub char_interval: Duration,
    /// `None` waits for the provider indefinitely.
    pub request_timeout: Option<Duration>,
    pub classification: ClassificationMode,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            char_interval: DEFAULT_CHAR_INTERVAL,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            classification: ClassificationMode::Lenient,
        }
    }
}

/// What a host renders: a loading flag and the current error banner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationRequestState {
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
enum SessionState {
    Idle {
        anchor: Option<SelectionAnchor>,
        error: Option<String>,
    },
    Loading {
        anchor: SelectionAnchor,
        stage: LoadingStage,
    },
}

#[derive(Debug)]
enum LoadingStage {
    AwaitingReply,
    Streaming {
        reveal: StreamReveal,
        line_break: NodeId,
    },
}

/// Handed out by [`GenerationOrchestrator::begin`]: the prompt to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationTicket {
    pub prompt: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Inserted { fragment: NodeId },
    Streaming { container: NodeId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamProgress {
    Revealed(char),
    Finished { container: NodeId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    Fragment(NodeId),
    Text(NodeId),
}

/// Owns the note and drives at most one generation cycle at a time.
///
/// Hosts can either step the cycle themselves (`begin`, `finish_reply`,
/// `tick_stream`) from an event loop, or await [`Self::generate`].
pub struct GenerationOrchestrator {
    editor: DocumentEditor,
    state: SessionState,
    selection_label: Option<String>,
    sanitizer: Arc<dyn Sanitizer>,
    settings: GenerationSettings,
}

impl GenerationOrchestrator {
    pub fn new(
        editor: DocumentEditor,
        sanitizer: Arc<dyn Sanitizer>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            editor,
            state: SessionState::Idle {
                anchor: None,
                error: None,
            },
            selection_label: None,
            sanitizer,
            settings,
        }
    }

    pub fn with_document(document: Document, settings: GenerationSettings) -> Self {
        Self::new(
            DocumentEditor::new(document),
            Arc::new(AmmoniaSanitizer::new()),
            settings,
        )
    }

    pub fn editor(&self) -> &DocumentEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut DocumentEditor {
        &mut self.editor
    }

    pub fn document(&self) -> &Document {
        self.editor.document()
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Loading { .. })
    }

    pub fn is_streaming(&self) -> bool {
        matches!(
            self.state,
            SessionState::Loading {
                stage: LoadingStage::Streaming { .. },
                ..
            }
        )
    }

    pub fn request_state(&self) -> GenerationRequestState {
        match &self.state {
            SessionState::Idle { error, .. } => GenerationRequestState {
                loading: false,
                error: error.clone(),
            },
            SessionState::Loading { .. } => GenerationRequestState {
                loading: true,
                error: None,
            },
        }
    }

    /// The anchor a generation would use, or is using.
    pub fn live_anchor(&self) -> Option<&SelectionAnchor> {
        match &self.state {
            SessionState::Idle { anchor, .. } => anchor.as_ref(),
            SessionState::Loading { anchor, .. } => Some(anchor),
        }
    }

    pub fn selection_label(&self) -> Option<&str> {
        self.selection_label.as_deref()
    }

    /// Record the user's selection as the next generation anchor.
    ///
    /// Ignored while a generation is in flight so the running cycle keeps
    /// its anchor.
    pub fn capture_selection(&mut self) -> Option<&str> {
        if self.is_loading() {
            debug!("selection ignored while loading");
            return None;
        }
        let anchor = self.editor.capture_from_user_selection()?;
        self.store_anchor(anchor);
        self.selection_label()
    }

    /// Capture the caret line and begin a generation with it.
    pub fn capture_line(&mut self) -> Result<Option<GenerationTicket>, GenerationError> {
        if self.is_loading() {
            return Err(GenerationError::Busy);
        }
        let Some(anchor) = self.editor.capture_from_current_line() else {
            return Ok(None);
        };
        self.store_anchor(anchor);
        self.begin().map(Some)
    }

    fn store_anchor(&mut self, anchor: SelectionAnchor) {
        if let SessionState::Idle {
            anchor: slot,
            error: _,
        } = &mut self.state
        {
            if let Some(previous) = slot.replace(anchor.clone()) {
                self.editor.document_mut().release_range(previous.range);
            }
            debug!(text = %anchor.text, "anchor captured");
            self.selection_label = Some(anchor.text);
        }
    }

    /// Start a cycle with the live anchor.
    pub fn begin(&mut self) -> Result<GenerationTicket, GenerationError> {
        if self.is_loading() {
            warn!("generation requested while another is running");
            return Err(GenerationError::Busy);
        }
        let previous = mem::replace(
            &mut self.state,
            SessionState::Idle {
                anchor: None,
                error: None,
            },
        );
        let SessionState::Idle {
            anchor: Some(anchor),
            ..
        } = previous
        else {
            return Err(self.fail(GenerationError::NoSelection));
        };

        let prompt = build_prompt(&anchor.text);
        info!(text = %anchor.text, "generation started");
        self.state = SessionState::Loading {
            anchor,
            stage: LoadingStage::AwaitingReply,
        };
        Ok(GenerationTicket { prompt })
    }

    /// Feed the provider's reply into the running cycle.
    pub fn finish_reply(
        &mut self,
        reply: Result<String, GenerationError>,
    ) -> Result<Completion, GenerationError> {
        let anchor = match &self.state {
            SessionState::Loading {
                anchor,
                stage: LoadingStage::AwaitingReply,
            } => anchor.clone(),
            _ => return Err(GenerationError::NotPending),
        };
        match self.complete(anchor, reply) {
            Ok(completion) => Ok(completion),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn complete(
        &mut self,
        anchor: SelectionAnchor,
        reply: Result<String, GenerationError>,
    ) -> Result<Completion, GenerationError> {
        let raw = reply?;
        let classified = classify_with(self.settings.classification, &raw)?;
        debug!(ui = classified.is_ui(), len = raw.len(), "reply classified");
        match classified {
            ClassifiedResponse::Ui { markup } => {
                let markup = SanitizedMarkup::from_untrusted(&markup, self.sanitizer.as_ref())?;
                let spliced = splice_ui_fragment(self.editor.document_mut(), &anchor, markup)?;
                self.editor.clear_mark();
                self.settle(true);
                Ok(Completion::Inserted {
                    fragment: spliced.container,
                })
            }
            ClassifiedResponse::Text { body } => {
                let spliced = splice_text_container(self.editor.document_mut(), &anchor)?;
                self.editor.clear_mark();
                let reveal = StreamReveal::new(spliced.container, &body, self.settings.char_interval);
                info!(chars = reveal.len(), "streaming text reply");
                self.state = SessionState::Loading {
                    anchor,
                    stage: LoadingStage::Streaming {
                        reveal,
                        line_break: spliced.line_break,
                    },
                };
                Ok(Completion::Streaming {
                    container: spliced.container,
                })
            }
        }
    }

    /// Reveal one more character of the streaming reply.
    pub fn tick_stream(&mut self) -> Result<StreamProgress, GenerationError> {
        let SessionState::Loading {
            stage: LoadingStage::Streaming { reveal, line_break },
            ..
        } = &mut self.state
        else {
            return Err(GenerationError::NotPending);
        };
        let container = reveal.container();
        let line_break = *line_break;
        let step = reveal.tick(self.editor.document_mut());

        match step {
            Ok(RevealStep::Revealed(ch)) => Ok(StreamProgress::Revealed(ch)),
            Ok(RevealStep::Finished) => {
                self.place_caret_after(line_break);
                self.settle(false);
                info!("streaming finished");
                Ok(StreamProgress::Finished { container })
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Stop a streaming reveal; text already revealed stays.
    pub fn cancel_stream(&mut self) -> bool {
        let SessionState::Loading {
            stage: LoadingStage::Streaming { reveal, .. },
            ..
        } = &self.state
        else {
            return false;
        };
        reveal.cancel();
        debug!(revealed = reveal.revealed(), "stream cancelled");
        self.tick_stream().is_ok()
    }

    /// Pacing for the reveal currently running, if any.
    pub fn stream_pacing(&self) -> Option<(Duration, CancellationToken)> {
        match &self.state {
            SessionState::Loading {
                stage: LoadingStage::Streaming { reveal, .. },
                ..
            } => Some((reveal.interval(), reveal.cancellation_token())),
            _ => None,
        }
    }

    fn place_caret_after(&mut self, node: NodeId) {
        let document = self.editor.document_mut();
        let slot = document
            .parent(node)
            .zip(document.index_in_parent(node))
            .map(|(parent, index)| Position::new(parent, index + 1));
        if let Some(position) = slot {
            if let Err(err) = document.set_caret(position) {
                debug!(%err, "caret left in place after stream");
            }
        }
    }

    fn settle(&mut self, anchor_bound: bool) {
        let previous = mem::replace(
            &mut self.state,
            SessionState::Idle {
                anchor: None,
                error: None,
            },
        );
        if let SessionState::Loading { anchor, .. } = previous {
            if !anchor_bound {
                self.editor.document_mut().release_range(anchor.range);
            }
        }
        self.selection_label = None;
    }

    fn fail(&mut self, err: GenerationError) -> GenerationError {
        let previous = mem::replace(
            &mut self.state,
            SessionState::Idle {
                anchor: None,
                error: Some(err.banner_message()),
            },
        );
        let anchor = match previous {
            SessionState::Loading { anchor, .. } => Some(anchor),
            SessionState::Idle { anchor, .. } => anchor,
        };
        if let Some(anchor) = anchor {
            self.editor.document_mut().release_range(anchor.range);
        }
        self.selection_label = None;
        warn!(%err, "generation failed");
        err
    }

    pub fn dismiss_error(&mut self) {
        if let SessionState::Idle { error, .. } = &mut self.state {
            *error = None;
        }
    }

    /// Run the bound action of `fragment` for a click on a control carrying
    /// `action`.
    pub fn click_fragment(
        &mut self,
        fragment: NodeId,
        action: Option<&str>,
    ) -> Result<Option<FragmentAction>, GenerationError> {
        let applied = dispatch_fragment_click(self.editor.document_mut(), fragment, action)?;
        if applied.is_some() {
            self.clear_idle_anchor();
            self.editor.ensure_cursor_selectable();
        }
        Ok(applied)
    }

    fn clear_idle_anchor(&mut self) {
        if let SessionState::Idle { anchor, .. } = &mut self.state {
            if let Some(previous) = anchor.take() {
                self.editor.document_mut().release_range(previous.range);
            }
            self.selection_label = None;
        }
    }

    /// Drive a whole cycle with the live anchor.
    pub async fn generate(
        &mut self,
        provider: &dyn ContentProvider,
    ) -> Result<GenerationOutcome, GenerationError> {
        let ticket = self.begin()?;
        self.run_cycle(ticket, provider).await
    }

    /// Capture the caret line and drive a whole cycle with it.
    pub async fn generate_from_line(
        &mut self,
        provider: &dyn ContentProvider,
    ) -> Result<Option<GenerationOutcome>, GenerationError> {
        match self.capture_line()? {
            Some(ticket) => self.run_cycle(ticket, provider).await.map(Some),
            None => Ok(None),
        }
    }

    async fn run_cycle(
        &mut self,
        ticket: GenerationTicket,
        provider: &dyn ContentProvider,
    ) -> Result<GenerationOutcome, GenerationError> {
        let reply = request_content(provider, &ticket.prompt, self.settings.request_timeout).await;
        match self.finish_reply(reply)? {
            Completion::Inserted { fragment } => Ok(GenerationOutcome::Fragment(fragment)),
            Completion::Streaming { container } => {
                while let Some((interval, token)) = self.stream_pacing() {
                    pace(interval, &token).await;
                    if let StreamProgress::Finished { .. } = self.tick_stream()? {
                        break;
                    }
                }
                Ok(GenerationOutcome::Text(container))
            }
        }
    }
}

/// Ask `provider` for a reply, giving up after `timeout`.
pub async fn request_content(
    provider: &dyn ContentProvider,
    prompt: &str,
    timeout: Option<Duration>,
) -> Result<String, GenerationError> {
    debug!(provider = provider.name(), "requesting content");
    let call = provider.generate_content(prompt);
    let reply = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| GenerationError::Timeout(limit))?,
        None => call.await,
    };
    Ok(reply?)
}

#[cfg(test)]
#[path = "generation_tests.rs"]
mod generation_tests;
