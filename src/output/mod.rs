//! Output module - dataset writers, preview and frequency summary.

mod summary;
mod writer;

pub use summary::*;
pub use writer::*;
