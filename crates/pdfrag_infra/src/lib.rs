mod env;
mod ollama;
mod pdf;
mod store;

pub use env::*;
pub use ollama::*;
pub use pdf::*;
pub use store::*;
