use std::borrow::Cow;

use nu_ansi_term::{Color, Style};
use reedline::{Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};

const MULTILINE_INDICATOR: &str = "::: ";
const RIGHT_CHEVRON: &str = "❯";

/// Prompt showing how many chunks the session is answering from.
#[derive(Debug, Clone, Default)]
pub struct QueryPrompt {
    pub indexed_chunks: usize,
}

impl QueryPrompt {
    pub fn new(indexed_chunks: usize) -> Self {
        Self { indexed_chunks }
    }
}

impl Prompt for QueryPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let label = Style::new().fg(Color::Cyan).bold().paint("pdfrag");
        let chevron = Style::new().fg(Color::Green).bold().paint(RIGHT_CHEVRON);
        Cow::Owned(format!("{label} {chevron} "))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        let text = format!("[{} chunks]", self.indexed_chunks);
        Cow::Owned(Style::new().fg(Color::DarkGray).paint(text).to_string())
    }

    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed(MULTILINE_INDICATOR)
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({prefix}reverse-search: {}) ", history_search.term))
    }
}
