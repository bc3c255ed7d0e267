//! Conversation memory.
//!
//! In-process only: sessions live in a [`SessionStore`] and are trimmed by
//! the background [`Reaper`]. Nothing is persisted.

pub mod reaper;
pub mod session;

pub use reaper::{Reaper, ReaperHandle};
pub use session::{Role, Session, SessionHandle, SessionStore, Turn};
