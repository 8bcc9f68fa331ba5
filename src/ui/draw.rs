use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use super::overlays::{draw_dialog_overlay, draw_help_overlay};
use super::widgets::{draw_context_list, draw_prompt_input, draw_reply_view, draw_status_bar};
use crate::app::App;

/// Draw the UI to the terminal
pub fn draw(f: &mut Frame, app: &App) {
    // Main panels, prompt input (one line plus borders), status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    let sidebar = app.sidebar_percent.clamp(10, 90);
    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(sidebar),
            Constraint::Percentage(100 - sidebar),
        ])
        .split(chunks[0]);

    draw_context_list(f, panels[0], app);
    draw_reply_view(f, panels[1], app);
    draw_prompt_input(f, chunks[1], app);
    draw_status_bar(f, chunks[2], app);

    // Overlays last so they're on top
    if app.show_help {
        draw_help_overlay(f);
    }

    if let Some(dialog) = &app.dialog {
        draw_dialog_overlay(f, dialog);
    }
}
