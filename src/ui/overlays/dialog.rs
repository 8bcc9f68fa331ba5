use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::ui::types::{Dialog, DialogKind};
use crate::ui::utils::centered_rect;

/// Draw a modal dialog centered over the main view
pub fn draw_dialog_overlay(f: &mut Frame, dialog: &Dialog) {
    let (border, body) = match &dialog.kind {
        DialogKind::Error(message) => (
            Color::Red,
            vec![
                Line::from(Span::styled(message.as_str(), Style::default().fg(Color::Red))),
                Line::from(""),
                Line::from(Span::styled("Enter/Esc to close", Style::default().fg(Color::Gray))),
            ],
        ),
        DialogKind::AddText | DialogKind::AddFile => (
            Color::Green,
            vec![
                Line::from(vec![
                    Span::raw(dialog.input.as_str()),
                    Span::styled("_", Style::default().fg(Color::Green)),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    "Enter to add, Esc to cancel",
                    Style::default().fg(Color::Gray),
                )),
            ],
        ),
    };

    let area = centered_rect(60, 25, f.area());
    let paragraph = Paragraph::new(body)
        .block(
            Block::default()
                .title(dialog.title())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}
