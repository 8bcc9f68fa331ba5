//! The conversation being assembled: context items, the prompt and the reply.

use std::io;
use std::path::{Path, PathBuf};

/// One piece of context sent ahead of the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextItem {
    Text(String),
    /// Path as given, or relative to the working directory when it lies beneath it
    File(PathBuf),
}

impl ContextItem {
    /// Build a file item. Absolute paths under `working_dir` are stored relative to it.
    pub fn file(path: impl AsRef<Path>, working_dir: &Path) -> Self {
        let path = path.as_ref();
        let stored = if path.is_absolute() {
            path.strip_prefix(working_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf())
        } else {
            path.to_path_buf()
        };
        Self::File(stored)
    }

    /// Single-line label for the context list
    pub fn title(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::File(path) => format!("File: {}", path.display()),
        }
    }

    /// Text sent to the model. File contents are read now, not when the item was added.
    pub async fn message(&self, working_dir: &Path) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::File(path) => {
                let mut message = format!("File: {}\n", path.display());
                match tokio::fs::read_to_string(working_dir.join(path)).await {
                    Ok(contents) => {
                        message.push_str("```\n");
                        message.push_str(&contents);
                        message.push_str("```\n");
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        message.push_str("File does not exist.\n");
                    }
                    Err(e) => {
                        message.push_str(&format!("Error reading file: {e}\n"));
                    }
                }
                message
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    working_dir: PathBuf,
    context: Vec<ContextItem>,
    prompt: String,
    reply: String,
}

impl Session {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            context: Vec::new(),
            prompt: String::new(),
            reply: String::new(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn context(&self) -> &[ContextItem] {
        &self.context
    }

    pub fn add_context_item(&mut self, item: ContextItem) {
        self.context.push(item);
    }

    pub fn add_context_text(&mut self, text: impl Into<String>) {
        self.add_context_item(ContextItem::Text(text.into()));
    }

    pub fn add_context_file(&mut self, path: impl AsRef<Path>) {
        let item = ContextItem::file(path, &self.working_dir);
        self.add_context_item(item);
    }

    /// Remove the item at `index`. Out of range is a no-op.
    pub fn delete_context_item(&mut self, index: usize) -> Option<ContextItem> {
        if index < self.context.len() {
            Some(self.context.remove(index))
        } else {
            None
        }
    }

    /// All context items rendered for the model, each followed by a blank line
    pub async fn context_message(&self) -> String {
        let mut message = String::new();
        for item in &self.context {
            message.push_str(&item.message(&self.working_dir).await);
            message.push_str("\n\n");
        }
        message
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn reply(&self) -> &str {
        &self.reply
    }

    pub fn append_chunk(&mut self, chunk: &str) {
        self.reply.push_str(chunk);
    }

    /// Replace the streamed reply with the provider's final text
    pub fn finish_streaming(&mut self, final_text: impl Into<String>) {
        self.reply = final_text.into();
    }

    pub fn clear_reply(&mut self) {
        self.reply.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn text_item_title_and_message_are_the_text() {
        let item = ContextItem::Text("hello".into());
        assert_eq!(item.title(), "hello");
        assert_eq!(item.message(Path::new("/")).await, "hello");
    }

    #[test]
    fn absolute_file_under_working_dir_is_stored_relative() {
        let item = ContextItem::file("/work/src/main.rs", Path::new("/work"));
        assert_eq!(item, ContextItem::File(PathBuf::from("src/main.rs")));
        assert_eq!(item.title(), "File: src/main.rs");
    }

    #[test]
    fn paths_outside_working_dir_are_kept() {
        let item = ContextItem::file("/etc/hosts", Path::new("/work"));
        assert_eq!(item, ContextItem::File(PathBuf::from("/etc/hosts")));

        let item = ContextItem::file("notes.txt", Path::new("/work"));
        assert_eq!(item, ContextItem::File(PathBuf::from("notes.txt")));
    }

    #[tokio::test]
    async fn file_message_wraps_contents_in_a_fence() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "line\n").unwrap();

        let item = ContextItem::file("a.txt", dir.path());
        assert_eq!(item.message(dir.path()).await, "File: a.txt\n```\nline\n```\n");
    }

    #[tokio::test]
    async fn missing_file_is_reported_in_message() {
        let dir = TempDir::new().unwrap();
        let item = ContextItem::file("gone.txt", dir.path());
        assert_eq!(item.message(dir.path()).await, "File: gone.txt\nFile does not exist.\n");
    }

    #[tokio::test]
    async fn unreadable_file_is_reported_in_message() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("a_dir")).unwrap();
        let item = ContextItem::file("a_dir", dir.path());
        let message = item.message(dir.path()).await;
        assert!(message.starts_with("File: a_dir\nError reading file: "));
    }

    #[tokio::test]
    async fn file_is_read_when_the_message_is_built() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::new(dir.path());
        session.add_context_file("late.txt");

        std::fs::write(dir.path().join("late.txt"), "now\n").unwrap();
        assert_eq!(session.context_message().await, "File: late.txt\n```\nnow\n```\n\n\n");
    }

    #[tokio::test]
    async fn context_message_keeps_insertion_order() {
        let mut session = Session::new("/work");
        session.add_context_text("first");
        session.add_context_text("second");
        assert_eq!(session.context_message().await, "first\n\nsecond\n\n");
    }

    #[test]
    fn delete_out_of_range_is_a_noop() {
        let mut session = Session::new("/work");
        assert_eq!(session.delete_context_item(0), None);

        session.add_context_text("a");
        session.add_context_text("b");
        assert_eq!(session.delete_context_item(5), None);
        assert_eq!(session.context().len(), 2);

        assert_eq!(
            session.delete_context_item(0),
            Some(ContextItem::Text("a".into()))
        );
        assert_eq!(session.context(), &[ContextItem::Text("b".into())]);
    }

    #[test]
    fn reply_accumulates_and_final_text_replaces() {
        let mut session = Session::new("/work");
        session.append_chunk("Hel");
        session.append_chunk("lo");
        assert_eq!(session.reply(), "Hello");

        session.finish_streaming("Hello!");
        assert_eq!(session.reply(), "Hello!");

        session.clear_reply();
        assert!(session.reply().is_empty());
    }
}
