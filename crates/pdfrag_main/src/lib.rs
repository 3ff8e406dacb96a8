mod cli;
mod editor;
mod prompt;
mod ui;

pub use cli::*;
pub use ui::*;
