use crate::app::App;
use crate::event::Event;
use crate::ui::types::{DialogKind, Focus};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

pub struct EventHandler<'a> {
    app: &'a mut App,
}

impl<'a> EventHandler<'a> {
    pub fn new(app: &'a mut App) -> Self {
        Self { app }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<bool> {
        // Returns true if the app should quit, false otherwise
        if key.kind == KeyEventKind::Release {
            return Ok(false);
        }

        if self.app.dialog.is_some() {
            self.handle_dialog_key(key);
            return Ok(false);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc if self.app.show_help => {
                self.app.show_help = false;
            }
            KeyCode::Esc => {
                self.app.quit();
                return Ok(true);
            }
            KeyCode::Char('c') if ctrl => self.app.cancel_stream(),
            KeyCode::Char('n') if ctrl => {
                self.app.update(Event::NewSessionRequested)?;
            }
            KeyCode::Char('a') if ctrl => self.app.open_dialog(DialogKind::AddText),
            KeyCode::Tab => self.app.cycle_focus(true),
            KeyCode::BackTab => self.app.cycle_focus(false),
            KeyCode::Enter => {
                self.app.update(Event::RunRequested)?;
            }
            _ => match self.app.focus {
                Focus::Input => self.handle_input_key(key),
                Focus::Context => self.handle_context_key(key),
                Focus::Reply => self.handle_reply_key(key),
            },
        }

        Ok(self.app.should_quit)
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        let accepts_input = match &self.app.dialog {
            Some(dialog) => dialog.accepts_input(),
            None => return,
        };

        match key.code {
            KeyCode::Esc => self.app.close_dialog(),
            KeyCode::Enter if accepts_input => self.app.submit_dialog(),
            KeyCode::Enter => self.app.close_dialog(),
            KeyCode::Backspace => {
                if let Some(dialog) = self.app.dialog.as_mut() {
                    dialog.input.pop();
                }
            }
            KeyCode::Char(c) if accepts_input => {
                if let Some(dialog) = self.app.dialog.as_mut() {
                    dialog.input.push(c);
                }
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Backspace => self.app.input.delete_char(),
            KeyCode::Up => self.app.input.history_prev(),
            KeyCode::Down => self.app.input.history_next(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.app.input.add_char(c);
            }
            _ => {}
        }
    }

    fn handle_context_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.app.select_prev_context(),
            KeyCode::Down | KeyCode::Char('j') => self.app.select_next_context(),
            KeyCode::Char('f') => self.app.open_dialog(DialogKind::AddFile),
            KeyCode::Char('n') => self.app.open_dialog(DialogKind::AddText),
            KeyCode::Char('d') => {
                let index = self.app.selected_context;
                self.app.delete_context_item(index);
            }
            KeyCode::Char('?') => self.app.toggle_help(),
            _ => {}
        }
    }

    fn handle_reply_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.app.scroll_reply_up(),
            KeyCode::Down | KeyCode::Char('j') => self.app.scroll_reply_down(),
            KeyCode::Char('?') => self.app.toggle_help(),
            _ => {}
        }
    }
}
