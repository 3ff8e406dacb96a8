mod answer;
mod chunk;
mod config;
mod error;
mod page;
mod report;
mod store;
mod traits;

pub use answer::*;
pub use chunk::*;
pub use config::*;
pub use error::*;
pub use page::*;
pub use report::*;
pub use store::*;
pub use traits::*;
