//! Core types for lexguard.

mod analysis;
mod history;

pub use analysis::*;
pub use history::*;
