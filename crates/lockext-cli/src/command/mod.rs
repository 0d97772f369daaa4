//! Subcommand implementations.

mod health;
mod invoke;
mod serve;

pub use health::health;
pub use invoke::invoke;
pub use serve::serve;
