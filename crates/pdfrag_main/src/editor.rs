use std::path::PathBuf;

use nu_ansi_term::{Color, Style};
use reedline::{DefaultHinter, FileBackedHistory, Prompt, Reedline, Signal};

const HISTORY_CAPACITY: usize = 1024;

/// Line editor for the question loop, with history kept across sessions.
pub struct QueryEditor {
    editor: Reedline,
}

#[derive(Debug, PartialEq)]
pub enum ReadResult {
    Question(String),
    Empty,
    Exit,
}

impl QueryEditor {
    pub fn new(history_file: Option<PathBuf>) -> Self {
        let history = history_file
            .and_then(|path| FileBackedHistory::with_file(HISTORY_CAPACITY, path).ok())
            .unwrap_or_default();

        let editor = Reedline::create()
            .with_history(Box::new(history))
            .with_hinter(Box::new(
                DefaultHinter::default().with_style(Style::new().fg(Color::DarkGray)),
            ))
            .with_ansi_colors(true);
        Self { editor }
    }

    pub fn prompt(&mut self, prompt: &dyn Prompt) -> anyhow::Result<ReadResult> {
        let signal = self.editor.read_line(prompt);
        signal.map(Into::into).map_err(|e| anyhow::anyhow!(e))
    }
}

impl From<Signal> for ReadResult {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Success(buffer) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    ReadResult::Empty
                } else if trimmed.eq_ignore_ascii_case("exit") {
                    ReadResult::Exit
                } else {
                    ReadResult::Question(trimmed.to_string())
                }
            }
            Signal::CtrlC | Signal::CtrlD => ReadResult::Exit,
        }
    }
}
