use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::panel;
use crate::app::{App, Phase};
use crate::ui::types::Focus;

/// Draw the prompt and the streamed reply
pub fn draw_reply_view(f: &mut Frame, area: Rect, app: &App) {
    let title = match app.phase {
        Phase::Idle => "Messages".to_string(),
        Phase::AwaitingReply { .. } => "Messages (streaming)".to_string(),
        Phase::Cancelling { .. } => "Messages (cancelling)".to_string(),
    };
    let block = panel(title, app.focus == Focus::Reply);

    let mut lines = Vec::new();
    let prompt = app.session.prompt();
    if !prompt.is_empty() {
        for line in prompt.lines() {
            lines.push(
                Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Right),
            );
        }
        lines.push(Line::from(""));
    }

    for line in app.session.reply().lines() {
        lines.push(Line::from(line.to_string()));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.reply_scroll, 0));

    f.render_widget(paragraph, area);
}
