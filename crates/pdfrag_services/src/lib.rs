mod chunker;
mod pipeline;
mod postprocess;
mod query;

#[cfg(test)]
mod fixtures;

pub use chunker::*;
pub use pipeline::*;
pub use postprocess::*;
pub use query::*;
