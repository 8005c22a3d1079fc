//! Weighted sampling of question answers.

mod weighted;

pub use weighted::*;
