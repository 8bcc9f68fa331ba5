/// Prompt editor state
#[derive(Debug, Default)]
pub struct InputState {
    /// Current prompt text
    pub input: String,
    /// Submitted prompts for Up/Down navigation
    pub history: Vec<String>,
    /// Current position in history (None = not navigating)
    pub history_index: Option<usize>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_char(&mut self, c: char) {
        self.reset_history_nav();
        self.input.push(c);
    }

    pub fn delete_char(&mut self) {
        self.input.pop();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.history_index = None;
    }

    pub fn is_blank(&self) -> bool {
        self.input.trim().is_empty()
    }

    /// Take the text for submission, recording it in history
    pub fn take(&mut self) -> String {
        let text = std::mem::take(&mut self.input);
        if !text.trim().is_empty() {
            self.history.push(text.clone());
        }
        self.history_index = None;
        text
    }

    /// Navigate backward in history (Up arrow)
    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }

        let new_index = match self.history_index {
            None => self.history.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };

        self.history_index = Some(new_index);
        self.input = self.history[new_index].clone();
    }

    /// Navigate forward in history (Down arrow)
    pub fn history_next(&mut self) {
        match self.history_index {
            None => {}
            Some(i) if i + 1 >= self.history.len() => {
                self.history_index = None;
                self.input.clear();
            }
            Some(i) => {
                self.history_index = Some(i + 1);
                self.input = self.history[i + 1].clone();
            }
        }
    }

    fn reset_history_nav(&mut self) {
        self.history_index = None;
    }
}
