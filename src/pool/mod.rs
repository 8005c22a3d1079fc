//! Pool module - record builder and worker pool.

mod builder;
mod worker;

pub use builder::*;
pub use worker::*;
