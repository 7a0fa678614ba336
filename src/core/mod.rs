//! Core types - pure abstractions shared across the codebase.

mod path;
mod state;

pub use path::{NodePath, split_action};
pub use state::{is_shutdown, register_server, setup_shutdown_handler};
