//! Line tokenization: the persistent state stack, lazy rule resolution,
//! injection composition, and the per-line state machine.

pub mod injection;
pub mod line;
pub(crate) mod resolve;
pub mod stack;
pub mod token;

pub use injection::{selector_priority, InjectionPriority};
pub use line::initial_stack;
pub use stack::{StateFrame, StateStack};
pub use token::{LineTokens, Token};
