use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use super::panel;
use crate::app::App;
use crate::ui::types::Focus;

/// Draw the context items, one title per row
pub fn draw_context_list(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Context;
    let items = app.session.context();
    let block = panel(format!("Context ({})", items.len()), focused);

    if items.is_empty() {
        let hint = Paragraph::new(vec![
            Line::from(Span::styled("No context items", Style::default().fg(Color::Gray))),
            Line::from(""),
            Line::from(vec![
                Span::styled("f", Style::default().fg(Color::Yellow)),
                Span::raw(" add file  "),
                Span::styled("n", Style::default().fg(Color::Yellow)),
                Span::raw(" add text"),
            ]),
        ])
        .block(block);
        f.render_widget(hint, area);
        return;
    }

    let rows: Vec<ListItem> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            // Only the first line fits in a row
            let title = item.title();
            let first_line = title.lines().next().unwrap_or("").to_string();
            let style = if focused && i == app.selected_context {
                Style::default().bg(Color::Blue)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(first_line, style)))
        })
        .collect();

    f.render_widget(List::new(rows).block(block), area);
}
