//! Core abstractions for labshell session tracking.
//!
//! This crate provides the fundamental building blocks:
//! - `Session` and its companion records
//! - `SessionFilter` / `SessionPage` for paginated listings
//! - Payload validation
//! - The `SessionStorage` trait and `SessionError`

pub mod query;
pub mod session;
pub mod traits;
pub mod validation;

pub use query::{Pagination, SessionFilter, SessionPage};
pub use session::{
    CommandHistory, CommandResult, Mode, Session, SessionDraft, SessionId, SessionStatus,
    Statistics,
};
pub use traits::{SessionError, SessionStorage};
