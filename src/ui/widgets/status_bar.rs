use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, Phase};
use crate::ui::types::StatusType;

/// Draw the status line: message or key hints, then the stream state
pub fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = if let Some((message, status_type)) = &app.status_message {
        // Show color-coded status message
        let color = match status_type {
            StatusType::Success => Color::Green,
            StatusType::Error => Color::Red,
            StatusType::Info => Color::Yellow,
        };
        vec![Span::styled(message.as_str(), Style::default().fg(color))]
    } else {
        let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
        let text = Style::default().fg(Color::Gray);
        vec![
            Span::styled("Enter", key),
            Span::styled(" run, ", text),
            Span::styled("Ctrl+A", key),
            Span::styled(" add text, ", text),
            Span::styled("Ctrl+N", key),
            Span::styled(" new session, ", text),
            Span::styled("Ctrl+C", key),
            Span::styled(" cancel, ", text),
            Span::styled("Esc", key),
            Span::styled(" quit", text),
        ]
    };

    let indicator = match app.phase {
        Phase::Idle => Span::styled(" [IDLE]", Style::default().fg(Color::Green)),
        Phase::AwaitingReply { .. } => Span::styled(
            " [STREAMING]",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Phase::Cancelling { .. } => Span::styled(" [CANCELLING]", Style::default().fg(Color::Yellow)),
    };
    spans.push(indicator);
    spans.push(Span::styled(
        format!(" {}", app.provider_name()),
        Style::default().fg(Color::DarkGray),
    ));

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Rgb(40, 40, 40)));

    f.render_widget(paragraph, area);
}
