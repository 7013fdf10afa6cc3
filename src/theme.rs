use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the note editor
#[derive(Clone, Debug)]
pub struct Theme {
    /// Background color for the note area
    pub background: Color,

    /// Foreground color for note text
    pub text_fg: Color,

    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color of the captured selection label in the status bar
    pub label_color: Color,

    /// Color of the loading indicator
    pub loading_color: Color,

    /// Foreground color for active selection
    pub selection_fg: Color,

    /// Background color for active selection
    pub selection_bg: Color,

    /// Foreground color for fragment controls
    pub control_fg: Color,

    /// Background color for fragment controls
    pub control_bg: Color,

    /// Foreground color for the error banner
    pub error_fg: Color,

    /// Background color for the error banner
    pub error_bg: Color,

    pub scrollbar_knob_fg: Color,
    pub scrollbar_track_fg: Color,

    /// Foreground color for menu items
    pub menu_fg: Color,

    /// Background color for menu
    pub menu_bg: Color,

    /// Foreground color for disabled menu items
    pub menu_disabled_fg: Color,

    /// Foreground color for selected menu entry
    pub menu_selected_fg: Color,

    /// Background color for selected menu entry
    pub menu_selected_bg: Color,

    /// Foreground color for disabled selected menu entry
    pub menu_selected_disabled_fg: Color,
}

const CANVAS: Color = Color::Rgb(0x22, 0x27, 0x2e);
const PANEL: Color = Color::Rgb(0x2d, 0x33, 0x3b);
const BORDER: Color = Color::Rgb(0x44, 0x4c, 0x56);
const MUTED: Color = Color::Rgb(0x76, 0x83, 0x90);
const TEXT: Color = Color::Rgb(0xad, 0xba, 0xc7);
const ALERT: Color = Color::Rgb(0xf4, 0x70, 0x67);

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: CANVAS,
            text_fg: TEXT,
            status_bar_fg: TEXT,
            status_bar_bg: PANEL,
            label_color: Color::LightGreen,
            loading_color: Color::LightYellow,
            selection_fg: Color::White,
            selection_bg: BORDER,
            control_fg: CANVAS,
            control_bg: TEXT,
            error_fg: Color::White,
            error_bg: ALERT,
            scrollbar_knob_fg: MUTED,
            scrollbar_track_fg: PANEL,
            menu_fg: TEXT,
            menu_bg: PANEL,
            menu_disabled_fg: MUTED,
            menu_selected_fg: Color::White,
            menu_selected_bg: BORDER,
            menu_selected_disabled_fg: MUTED,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base style for the note area
    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text_fg).bg(self.background)
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn label_style(&self) -> Style {
        Style::default().fg(self.label_color)
    }

    pub fn loading_style(&self) -> Style {
        Style::default()
            .fg(self.loading_color)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selection_style(&self) -> Style {
        Style::default().fg(self.selection_fg).bg(self.selection_bg)
    }

    /// Style for clickable controls inside fragments
    pub fn control_style(&self) -> Style {
        Style::default()
            .fg(self.control_fg)
            .bg(self.control_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error_fg).bg(self.error_bg)
    }

    pub fn scrollbar_knob_style(&self) -> Style {
        Style::default().fg(self.scrollbar_knob_fg)
    }

    pub fn scrollbar_track_style(&self) -> Style {
        Style::default().fg(self.scrollbar_track_fg)
    }

    /// Get the style for the menu/popup
    pub fn menu_style(&self) -> Style {
        Style::default().fg(self.menu_fg).bg(self.menu_bg)
    }

    /// Get the style for a disabled menu item
    pub fn menu_disabled_style(&self) -> Style {
        Style::default().fg(self.menu_disabled_fg)
    }

    /// Get the style for a selected menu entry
    pub fn menu_selected_style(&self) -> Style {
        Style::default()
            .fg(self.menu_selected_fg)
            .bg(self.menu_selected_bg)
    }

    /// Get the style for a disabled selected menu entry
    pub fn menu_selected_disabled_style(&self) -> Style {
        Style::default()
            .fg(self.menu_selected_disabled_fg)
            .bg(self.menu_selected_bg)
    }
}
