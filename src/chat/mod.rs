//! Chat session state and the offline responder.

mod fallback;
mod session;

pub use fallback::LocalResponder;
pub use session::{parse_command, ChatSession, Command, Mode, SessionEvent, Turn};
