mod context_list;
mod prompt_input;
mod reply_view;
mod status_bar;

pub use context_list::draw_context_list;
pub use prompt_input::draw_prompt_input;
pub use reply_view::draw_reply_view;
pub use status_bar::draw_status_bar;

use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders},
};

/// Bordered panel, highlighted when it has focus
fn panel(title: String, focused: bool) -> Block<'static> {
    let (border, title_style) = if focused {
        let green = Style::default().fg(Color::Green);
        (green, green.add_modifier(Modifier::BOLD))
    } else {
        (Style::default(), Style::default())
    };

    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(title, title_style))
}
