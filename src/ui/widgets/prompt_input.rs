use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::panel;
use crate::app::App;
use crate::ui::types::Focus;

/// Draw the prompt editor with a cursor when focused
pub fn draw_prompt_input(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Input;

    let mut spans = vec![Span::raw(app.input.input.as_str())];
    if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Green)));
    } else if app.input.input.is_empty() {
        spans.push(Span::styled(
            "Tab to type a message",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let paragraph =
        Paragraph::new(Line::from(spans)).block(panel("Message Assistant".to_string(), focused));
    f.render_widget(paragraph, area);
}
