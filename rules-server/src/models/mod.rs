//! Data models

pub mod evaluation;

pub use evaluation::*;
