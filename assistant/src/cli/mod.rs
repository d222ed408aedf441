//! CLI module
//!
//! - CLI argument definitions (args)
//! - Interactive approval loop (repl)

pub mod args;
pub mod repl;

pub use args::{Cli, Commands};
pub use repl::Repl;
