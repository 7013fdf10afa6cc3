use std::{
    env, io,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::Modifier,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};
use tokio::{runtime::Runtime, sync::mpsc};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use noteme::config::Config;
use noteme::document::{Document, Position as NotePosition};
use noteme::editor::DocumentEditor;
use noteme::error::GenerationError;
use noteme::generation::{
    Completion, GenerationOrchestrator, GenerationTicket, StreamProgress, request_content,
};
use noteme::import::load_note;
use noteme::provider::{ContentProvider, provider_from_config};
use noteme::render::{RenderResult, render_document};
use noteme::sanitize::AmmoniaSanitizer;
use noteme::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const MOUSE_SCROLL_LINES: usize = 3;
const LOG_DIR_VAR: &str = "NOTEME_LOG_DIR";
const LABEL_MAX_CHARS: usize = 32;
const USAGE: &str = "Usage: noteme [--config <settings.toml>] [note.ftml|note.md]";

type Reply = Result<String, GenerationError>;

fn main() -> Result<()> {
    let Some(args) = parse_args(env::args().skip(1))? else {
        eprintln!("{USAGE}");
        return Ok(());
    };
    let _guard = init_logging();
    run(args)
}

struct Args {
    note: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Option<Args>> {
    let mut args = Args {
        note: None,
        config: None,
    };
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--config" => {
                let Some(path) = raw.next() else {
                    bail!("--config needs a path\n{USAGE}");
                };
                args.config = Some(PathBuf::from(path));
            }
            _ if args.note.is_none() => args.note = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument {arg}\n{USAGE}"),
        }
    }
    Ok(Some(args))
}

// The terminal belongs to the UI, so logs go to a file.
fn init_logging() -> WorkerGuard {
    let log_dir = env::var(LOG_DIR_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir());
    let file_appender = tracing_appender::rolling::never(&log_dir, "noteme.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "noteme=info".into()))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    info!("starting noteme, logging to {}", log_dir.join("noteme.log").display());
    guard
}

fn run(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    let runtime = Runtime::new().context("failed to start async runtime")?;
    let provider = provider_from_config(&config);

    let (document, initial_status, label) = match &args.note {
        Some(path) => {
            let (document, status) = load_note(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            (document, status, path.display().to_string())
        }
        None => (Document::new(), None, "[scratch]".to_string()),
    };

    let session = GenerationOrchestrator::new(
        DocumentEditor::new(document),
        Arc::new(AmmoniaSanitizer::new()),
        config.settings.generation(),
    );
    let mut app = App::new(session, provider, runtime, label, initial_status);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit() {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let mut timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if let Some(wait) = app.until_next_reveal() {
            timeout = timeout.min(wait);
        }

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
            needs_redraw = true;
        }

        if app.collect_replies() {
            needs_redraw = true;
        }
        if app.advance_stream() {
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.has_status_message();
            app.on_tick();
            last_tick = Instant::now();
            if had_message_before && !app.has_status_message() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum MenuAction {
    Generate,
}

#[derive(Clone, Copy)]
struct MenuShortcut {
    key: char,
}

impl MenuShortcut {
    const fn new(key: char) -> Self {
        Self { key }
    }

    fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        matches!(code, KeyCode::Char(ch) if ch == self.key) && modifiers.is_empty()
    }
}

#[derive(Clone, Copy)]
struct MenuItem {
    label: &'static str,
    action: Option<MenuAction>,
    shortcut: Option<MenuShortcut>,
}

impl MenuItem {
    fn enabled_with_shortcut(
        label: &'static str,
        action: MenuAction,
        shortcut: MenuShortcut,
    ) -> Self {
        Self {
            label,
            action: Some(action),
            shortcut: Some(shortcut),
        }
    }

    fn disabled_with_shortcut(label: &'static str, shortcut: MenuShortcut) -> Self {
        Self {
            label,
            action: None,
            shortcut: Some(shortcut),
        }
    }

    fn is_enabled(&self) -> bool {
        self.action.is_some()
    }
}

enum MenuEntry {
    Section(String),
    Item(MenuItem),
}

struct ContextMenuState {
    entries: Vec<MenuEntry>,
    selected_index: usize,
}

impl ContextMenuState {
    fn new(entries: Vec<MenuEntry>) -> Self {
        let selected_index = entries
            .iter()
            .position(|entry| matches!(entry, MenuEntry::Item(_)))
            .unwrap_or(0);
        Self {
            entries,
            selected_index,
        }
    }

    fn current_action(&self) -> Option<MenuAction> {
        match self.entries.get(self.selected_index) {
            Some(MenuEntry::Item(item)) => item.action,
            _ => None,
        }
    }

    fn shortcut_action(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
    ) -> (bool, Option<MenuAction>) {
        for (idx, entry) in self.entries.iter().enumerate() {
            if let MenuEntry::Item(item) = entry
                && let Some(shortcut) = item.shortcut
                && shortcut.matches(code, modifiers)
            {
                self.selected_index = idx;
                return (true, item.action);
            }
        }
        (false, None)
    }
}

fn build_context_menu_entries(label: Option<&str>, can_generate: bool) -> Vec<MenuEntry> {
    let mut entries = Vec::new();
    if let Some(label) = label {
        entries.push(MenuEntry::Section(format!("“{}”", truncate_label(label))));
    }
    let shortcut = MenuShortcut::new('g');
    entries.push(MenuEntry::Item(if can_generate {
        MenuItem::enabled_with_shortcut("Generate", MenuAction::Generate, shortcut)
    } else {
        MenuItem::disabled_with_shortcut("Generate", shortcut)
    }));
    entries
}

fn truncate_label(label: &str) -> String {
    if label.chars().count() <= LABEL_MAX_CHARS {
        return label.to_string();
    }
    let head: String = label.chars().take(LABEL_MAX_CHARS - 1).collect();
    format!("{head}…")
}

fn is_generate_shortcut(code: KeyCode, modifiers: KeyModifiers) -> bool {
    matches!(code, KeyCode::Char('g')) && modifiers.contains(KeyModifiers::CONTROL)
}

#[derive(Clone, Debug)]
struct ScrollbarGeometry {
    knob_start: usize,
    knob_size: usize,
}

struct App {
    session: GenerationOrchestrator,
    provider: Arc<dyn ContentProvider>,
    runtime: Runtime,
    replies_tx: mpsc::UnboundedSender<Reply>,
    replies_rx: mpsc::UnboundedReceiver<Reply>,
    theme: Theme,
    note_label: String,
    scroll_top: usize,
    cursor_following: bool,
    should_quit: bool,
    status_message: Option<(String, Instant)>,
    context_menu: Option<ContextMenuState>,
    mouse_drag_anchor: Option<NotePosition>,
    next_reveal: Option<Instant>,
    last_render: Option<RenderResult>,
    last_text_area: Rect,
    last_viewport_height: usize,
    last_total_lines: usize,
}

impl App {
    fn new(
        session: GenerationOrchestrator,
        provider: Arc<dyn ContentProvider>,
        runtime: Runtime,
        note_label: String,
        initial_status: Option<String>,
    ) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            session,
            provider,
            runtime,
            replies_tx,
            replies_rx,
            theme: Theme::default(),
            note_label,
            scroll_top: 0,
            cursor_following: true,
            should_quit: false,
            status_message: initial_status.map(|msg| (msg, Instant::now())),
            context_menu: None,
            mouse_drag_anchor: None,
            next_reveal: None,
            last_render: None,
            last_text_area: Rect::default(),
            last_viewport_height: 0,
            last_total_lines: 0,
        }
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn has_status_message(&self) -> bool {
        self.status_message.is_some()
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn editor(&mut self) -> &mut DocumentEditor {
        self.session.editor_mut()
    }

    fn send_request(&mut self, ticket: GenerationTicket) {
        let provider = Arc::clone(&self.provider);
        let timeout = self.session.settings().request_timeout;
        let replies = self.replies_tx.clone();
        debug!(provider = provider.name(), "spawning provider request");
        self.runtime.spawn(async move {
            let reply = request_content(provider.as_ref(), &ticket.prompt, timeout).await;
            if replies.send(reply).is_err() {
                debug!("reply dropped, editor already closed");
            }
        });
    }

    fn start_generation(&mut self) {
        match self.session.begin() {
            Ok(ticket) => self.send_request(ticket),
            Err(GenerationError::Busy) => self.set_status("A generation is already running"),
            // The session already shows the banner.
            Err(_) => {}
        }
    }

    fn complete_line(&mut self) {
        match self.session.capture_line() {
            Ok(Some(ticket)) => self.send_request(ticket),
            Ok(None) => self.set_status("Nothing to complete on this line"),
            Err(GenerationError::Busy) => self.set_status("A generation is already running"),
            Err(_) => {}
        }
    }

    /// Feed finished provider calls into the session.
    fn collect_replies(&mut self) -> bool {
        let mut changed = false;
        while let Ok(reply) = self.replies_rx.try_recv() {
            changed = true;
            match self.session.finish_reply(reply) {
                Ok(Completion::Inserted { .. }) => {
                    self.cursor_following = true;
                    self.set_status("Inserted generated content");
                }
                Ok(Completion::Streaming { .. }) => {
                    self.cursor_following = true;
                    self.next_reveal = None;
                }
                Err(GenerationError::NotPending) => warn!("reply arrived with no pending request"),
                Err(err) => debug!(%err, "generation ended with an error"),
            }
        }
        changed
    }

    fn until_next_reveal(&self) -> Option<Duration> {
        self.session.stream_pacing()?;
        Some(
            self.next_reveal
                .map(|at| at.saturating_duration_since(Instant::now()))
                .unwrap_or_default(),
        )
    }

    /// Reveal the next character once its interval has passed.
    fn advance_stream(&mut self) -> bool {
        let Some((interval, _)) = self.session.stream_pacing() else {
            self.next_reveal = None;
            return false;
        };
        let now = Instant::now();
        let due = *self.next_reveal.get_or_insert(now + interval);
        if now < due {
            return false;
        }
        self.next_reveal = Some(due + interval);
        match self.session.tick_stream() {
            Ok(StreamProgress::Revealed(_)) => true,
            Ok(StreamProgress::Finished { .. }) => {
                self.next_reveal = None;
                true
            }
            Err(err) => {
                debug!(%err, "stream tick failed");
                self.next_reveal = None;
                true
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let request = self.session.request_state();
        let banner_height = if request.error.is_some() { 1 } else { 0 };
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(banner_height),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        let banner_area = vertical[0];
        let editor_area = vertical[1];
        let status_area = vertical[2];

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(editor_area);
        let text_area = horizontal[0];
        let scrollbar_area = horizontal[1];

        if let Some(error) = &request.error {
            let banner = Paragraph::new(Line::from(Span::raw(format!(" {error}  (Esc to dismiss)"))))
                .style(self.theme.error_style());
            frame.render_widget(banner, banner_area);
        }

        let selection = self.session.editor().selection();
        let render = render_document(
            self.session.document(),
            text_area.width.max(1) as usize,
            selection,
            &self.theme,
        );

        let viewport_height = text_area.height as usize;
        self.adjust_scroll(&render, viewport_height);
        self.last_viewport_height = viewport_height;
        self.last_total_lines = render.total_lines;
        self.last_text_area = text_area;

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .style(self.theme.text_style())
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        self.draw_scrollbar(frame, scrollbar_area);

        if let Some(cursor) = render.cursor
            && self.context_menu.is_none()
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width.saturating_sub(1));
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }
        self.last_render = Some(render);

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::NONE))
            .style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);

        if self.context_menu.is_some() {
            self.render_context_menu(frame, area);
        }
    }

    fn draw_scrollbar(&self, frame: &mut Frame, area: Rect) {
        if area.height == 0 || self.last_total_lines <= self.last_viewport_height {
            return;
        }
        let Some(geometry) = self.scrollbar_geometry() else {
            return;
        };
        let knob_end = geometry.knob_start.saturating_add(geometry.knob_size);

        for row in 0..self.last_viewport_height.min(area.height as usize) {
            let y = area.y + row as u16;
            let span = if row >= geometry.knob_start && row < knob_end {
                Span::styled("┃", self.theme.scrollbar_knob_style())
            } else {
                Span::styled("│", self.theme.scrollbar_track_style())
            };
            frame.render_widget(Paragraph::new(Line::from(span)), Rect::new(area.x, y, 1, 1));
        }
    }

    fn render_context_menu(&self, frame: &mut Frame, area: Rect) {
        let Some(menu) = &self.context_menu else {
            return;
        };
        if area.width < 3 || area.height < 3 {
            return;
        }

        let content_width = menu
            .entries
            .iter()
            .map(|entry| match entry {
                MenuEntry::Section(title) => title.chars().count(),
                // label, gap, shortcut key
                MenuEntry::Item(item) => item.label.chars().count() + 3,
            })
            .max()
            .unwrap_or(0) as u16;
        let min_width = 16.min(area.width);
        let width = (content_width + 4).min(area.width).max(min_width);
        let height = (menu.entries.len() as u16 + 2).min(area.height).max(3);

        let popup_area = Rect::new(
            area.x + (area.width.saturating_sub(width)) / 2,
            area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, popup_area);

        let label_width = width.saturating_sub(7) as usize;
        let items: Vec<ListItem> = menu
            .entries
            .iter()
            .map(|entry| match entry {
                MenuEntry::Section(title) => ListItem::new(Line::from(Span::styled(
                    title.clone(),
                    self.theme.menu_style().add_modifier(Modifier::BOLD),
                ))),
                MenuEntry::Item(item) => {
                    let key = item.shortcut.map(|shortcut| shortcut.key).unwrap_or(' ');
                    let content = format!("{:<label_width$}  {key}", item.label);
                    let style = if item.is_enabled() {
                        self.theme.menu_style()
                    } else {
                        self.theme.menu_disabled_style()
                    };
                    ListItem::new(Line::from(Span::styled(content, style)))
                }
            })
            .collect();

        let highlight = if menu.current_action().is_some() {
            self.theme.menu_selected_style()
        } else {
            self.theme.menu_selected_disabled_style()
        };
        let mut state = ListState::default();
        state.select(Some(menu.selected_index));

        let list = List::new(items)
            .highlight_style(highlight)
            .style(self.theme.menu_style())
            .block(
                Block::default()
                    .title("Generate")
                    .borders(Borders::ALL)
                    .style(self.theme.menu_style())
                    .border_style(self.theme.menu_disabled_style()),
            );
        frame.render_stateful_widget(list, popup_area, &mut state);
    }

    fn open_context_menu(&mut self) {
        let label = self.session.selection_label().map(str::to_string);
        let can_generate = !self.session.is_loading() && self.session.live_anchor().is_some();
        self.context_menu = Some(ContextMenuState::new(build_context_menu_entries(
            label.as_deref(),
            can_generate,
        )));
    }

    fn close_context_menu(&mut self) {
        self.context_menu = None;
    }

    fn handle_context_menu_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        if self.context_menu.is_none() {
            return false;
        }

        match code {
            KeyCode::Esc => {
                self.close_context_menu();
                true
            }
            KeyCode::Enter => {
                if let Some(action) = self
                    .context_menu
                    .as_ref()
                    .and_then(ContextMenuState::current_action)
                {
                    self.execute_menu_action(action);
                    self.close_context_menu();
                }
                true
            }
            KeyCode::Char(_) => {
                if let Some(menu) = self.context_menu.as_mut() {
                    let (handled, action) = menu.shortcut_action(code, modifiers);
                    if handled {
                        if let Some(action) = action {
                            self.execute_menu_action(action);
                            self.close_context_menu();
                        }
                        return true;
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn execute_menu_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::Generate => self.start_generation(),
        }
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();

        let mut spans = vec![Span::raw(format!(" {}", self.note_label))];
        if self.session.is_loading() {
            let text = if self.session.is_streaming() {
                "  Writing…"
            } else {
                "  Generating…"
            };
            spans.push(Span::styled(text, self.theme.loading_style()));
        }
        if let Some(label) = self.session.selection_label() {
            spans.push(Span::styled(
                format!("  Selected: “{}”", truncate_label(label)),
                self.theme.label_style(),
            ));
        }
        if let Some((message, _)) = &self.status_message {
            spans.push(Span::raw(format!("  {message}")));
        }

        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();
        let all_shortcuts = ["Tab:Complete", "^G:Generate", "^Q:Quit"];
        let mut shortcuts_to_show = Vec::new();
        let mut shortcuts_width = 0;
        for shortcut in all_shortcuts.iter().rev() {
            let test_width = if shortcuts_to_show.is_empty() {
                shortcut.chars().count()
            } else {
                shortcuts_width + 1 + shortcut.chars().count()
            };
            if left_width + 1 + test_width <= terminal_width {
                shortcuts_to_show.insert(0, *shortcut);
                shortcuts_width = test_width;
            } else {
                break;
            }
        }
        if !shortcuts_to_show.is_empty() {
            let padding = terminal_width
                .saturating_sub(left_width)
                .saturating_sub(shortcuts_width)
                .max(1);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::raw(shortcuts_to_show.join(" ")));
        }

        Line::from(spans)
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
        if self.cursor_following
            && let Some(cursor) = render.cursor
        {
            self.scroll_top = self.scroll_top_for_cursor(cursor.line, viewport, max_scroll);
        }
    }

    fn scrollbar_geometry(&self) -> Option<ScrollbarGeometry> {
        if self.last_viewport_height == 0 || self.last_total_lines <= self.last_viewport_height {
            return None;
        }

        let knob_size = ((self.last_viewport_height * self.last_viewport_height)
            / self.last_total_lines)
            .max(1)
            .min(self.last_viewport_height);
        let max_scroll = self
            .last_total_lines
            .saturating_sub(self.last_viewport_height);
        let knob_travel = self.last_viewport_height.saturating_sub(knob_size);
        let knob_start = if max_scroll == 0 || knob_travel == 0 {
            0
        } else {
            (self.scroll_top * knob_travel) / max_scroll
        };

        Some(ScrollbarGeometry {
            knob_start,
            knob_size,
        })
    }

    fn scroll_top_for_cursor(
        &self,
        cursor_line: usize,
        viewport: usize,
        max_scroll: usize,
    ) -> usize {
        let mut scroll = self.scroll_top.min(max_scroll);
        let margin = if viewport >= 3 { 1 } else { 0 };
        let top_limit = scroll.saturating_add(margin);
        let bottom_offset = viewport.saturating_sub(1).saturating_sub(margin);
        let bottom_limit = scroll.saturating_add(bottom_offset);
        if cursor_line < top_limit {
            scroll = cursor_line.saturating_sub(margin);
        } else if cursor_line > bottom_limit {
            scroll = cursor_line.saturating_sub(bottom_offset);
        }
        scroll.min(max_scroll)
    }

    fn scroll_by_lines(&mut self, delta: isize) {
        self.cursor_following = false;
        let max_scroll = self
            .last_total_lines
            .saturating_sub(self.last_viewport_height.max(1)) as isize;
        let new_scroll = (self.scroll_top as isize + delta).clamp(0, max_scroll.max(0));
        self.scroll_top = new_scroll as usize;
    }

    /// Screen cell to `(render line, column)` inside the text area.
    fn cell_at(&self, column: u16, row: u16) -> Option<(usize, u16)> {
        let area = self.last_text_area;
        if column < area.x || row < area.y || column >= area.x + area.width {
            return None;
        }
        if row >= area.y + area.height {
            return None;
        }
        Some((
            (row - area.y) as usize + self.scroll_top,
            column - area.x,
        ))
    }

    fn position_from_mouse(&self, column: u16, row: u16) -> Option<NotePosition> {
        let (line, col) = self.cell_at(column, row)?;
        self.last_render.as_ref()?.position_at(line, col)
    }

    fn handle_mouse_event(&mut self, event: MouseEvent) {
        if self.context_menu.is_some() {
            if matches!(event.kind, MouseEventKind::Down(MouseButton::Left)) {
                self.close_context_menu();
            }
            return;
        }

        match event.kind {
            MouseEventKind::ScrollUp => self.scroll_by_lines(-(MOUSE_SCROLL_LINES as isize)),
            MouseEventKind::ScrollDown => self.scroll_by_lines(MOUSE_SCROLL_LINES as isize),
            MouseEventKind::Down(MouseButton::Left) => self.handle_mouse_down(event),
            MouseEventKind::Drag(MouseButton::Left) => self.handle_mouse_drag(event),
            MouseEventKind::Up(MouseButton::Left) => self.handle_mouse_up(),
            _ => {}
        }
    }

    fn handle_mouse_down(&mut self, event: MouseEvent) {
        let Some((line, col)) = self.cell_at(event.column, event.row) else {
            return;
        };
        let control = self
            .last_render
            .as_ref()
            .and_then(|render| render.control_at(line, col))
            .map(|region| (region.fragment, region.action.clone()));
        if let Some((fragment, action)) = control {
            self.mouse_drag_anchor = None;
            match self.session.click_fragment(fragment, Some(&action)) {
                Ok(Some(applied)) => self.set_status(format!("Applied {applied}")),
                Ok(None) => debug!(%action, "control has nothing left to act on"),
                Err(err) => self.set_status(err.banner_message()),
            }
            return;
        }

        let Some(position) = self.position_from_mouse(event.column, event.row) else {
            return;
        };
        self.cursor_following = true;
        let editor = self.editor();
        if event.modifiers.contains(KeyModifiers::SHIFT) {
            editor.set_mark();
            if editor.document_mut().set_caret(position).is_err() {
                debug!("click landed outside the note");
            }
            self.mouse_drag_anchor = None;
        } else {
            editor.clear_mark();
            if editor.document_mut().set_caret(position).is_err() {
                debug!("click landed outside the note");
            }
            self.mouse_drag_anchor = Some(position);
        }
    }

    fn handle_mouse_drag(&mut self, event: MouseEvent) {
        let Some(anchor) = self.mouse_drag_anchor else {
            return;
        };
        let Some(position) = self.position_from_mouse(event.column, event.row) else {
            return;
        };
        self.editor().select(anchor, position);
    }

    fn handle_mouse_up(&mut self) {
        self.mouse_drag_anchor = None;
        if self.session.editor().selection().is_some() {
            self.session.capture_selection();
        }
    }

    fn move_caret(&mut self, code: KeyCode, extend: bool) -> bool {
        let editor = self.editor();
        if extend {
            editor.set_mark();
        } else {
            editor.clear_mark();
        }
        match code {
            KeyCode::Left => editor.move_left(),
            KeyCode::Right => editor.move_right(),
            KeyCode::Up => editor.move_up(),
            KeyCode::Down => editor.move_down(),
            KeyCode::Home => editor.move_to_line_start(),
            KeyCode::End => editor.move_to_line_end(),
            _ => false,
        }
    }

    fn handle_escape(&mut self) {
        if self.session.request_state().error.is_some() {
            self.session.dismiss_error();
        } else if self.session.is_streaming() {
            self.session.cancel_stream();
            self.set_status("Stopped writing");
        } else {
            self.editor().clear_mark();
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => {
                if self.handle_context_menu_key(code, modifiers) {
                    return Ok(());
                }
                if self.context_menu.is_some() {
                    return Ok(());
                }

                if is_generate_shortcut(code, modifiers) {
                    self.session.capture_selection();
                    self.open_context_menu();
                    return Ok(());
                }

                self.cursor_following = true;
                let shift = modifiers.contains(KeyModifiers::SHIFT);
                let control = modifiers.contains(KeyModifiers::CONTROL)
                    || modifiers.contains(KeyModifiers::ALT);
                match code {
                    KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => {
                        self.should_quit = true;
                    }
                    KeyCode::Esc => self.handle_escape(),
                    KeyCode::Tab => self.complete_line(),
                    KeyCode::Enter => {
                        self.editor().insert_line_break();
                    }
                    KeyCode::Backspace => {
                        self.editor().backspace();
                    }
                    KeyCode::Left
                    | KeyCode::Right
                    | KeyCode::Up
                    | KeyCode::Down
                    | KeyCode::Home
                    | KeyCode::End => {
                        self.move_caret(code, shift);
                    }
                    KeyCode::Char(ch) if !control => {
                        self.editor().insert_char(ch);
                    }
                    _ => {}
                }
            }
            Event::Mouse(mouse) => self.handle_mouse_event(mouse),
            _ => {}
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
    }
}
