/// Type of status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusType {
    Success,
    Error,
    Info,
}

/// Panel receiving keyboard input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Input,
    Context,
    Reply,
}

impl Focus {
    const ORDER: [Focus; 3] = [Focus::Input, Focus::Context, Focus::Reply];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    AddText,
    AddFile,
    Error(String),
}

/// Modal dialog drawn over the main view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub input: String,
}

impl Dialog {
    pub fn new(kind: DialogKind) -> Self {
        Self {
            kind,
            input: String::new(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            DialogKind::AddText => "Add Context Text",
            DialogKind::AddFile => "Add Context File",
            DialogKind::Error(_) => "Error",
        }
    }

    pub fn accepts_input(&self) -> bool {
        !matches!(self.kind, DialogKind::Error(_))
    }
}
