//! Core traits for lexguard collaborators.
//!
//! The browser surfaces the orchestrator depends on (active tab, page
//! messaging, extension storage, popup view) and the remote model are all
//! reached through these traits.

mod client;
mod host;
mod storage;
mod view;

pub use client::*;
pub use host::*;
pub use storage::*;
pub use view::*;
