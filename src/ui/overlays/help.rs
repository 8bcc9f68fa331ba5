use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::ui::utils::centered_rect;

const BINDINGS: &[(&str, &[(&str, &str)])] = &[
    (
        "Anywhere:",
        &[
            ("Enter", "Run the prompt"),
            ("Tab/Shift+Tab", "Cycle focus"),
            ("Ctrl+A", "Add text to the context"),
            ("Ctrl+N", "Start a new session"),
            ("Ctrl+C", "Cancel the streaming reply"),
            ("Esc", "Close dialog or help, otherwise quit"),
        ],
    ),
    (
        "Context list:",
        &[
            ("↑/↓ j/k", "Select item"),
            ("f", "Add a file"),
            ("n", "Add text"),
            ("d", "Delete selected item"),
        ],
    ),
    ("Messages:", &[("↑/↓ j/k", "Scroll")]),
    (
        "Remote control:",
        &[
            ("mark run", "Run from another terminal"),
            ("mark --help", "List all commands"),
        ],
    ),
];

/// Draw the help overlay
pub fn draw_help_overlay(f: &mut Frame) {
    let mut help_text = vec![
        Line::from(Span::styled("mark Help", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(""),
    ];

    for (section, keys) in BINDINGS {
        help_text.push(Line::from(Span::styled(
            *section,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (key, action) in *keys {
            help_text.push(Line::from(vec![
                Span::styled(format!("  {key:<14}"), Style::default().fg(Color::Yellow)),
                Span::raw(*action),
            ]));
        }
        help_text.push(Line::from(""));
    }

    help_text.push(Line::from(Span::styled(
        "Press Esc to close",
        Style::default().fg(Color::Gray),
    )));

    let area = centered_rect(60, 70, f.area());
    let paragraph = Paragraph::new(help_text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}
