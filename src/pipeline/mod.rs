//! Pipeline module - synthetic survey dataset generation.

mod generate;

pub use generate::*;
