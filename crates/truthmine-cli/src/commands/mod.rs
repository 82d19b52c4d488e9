//! CLI subcommand implementations.

pub mod inspect;
pub mod sign;
pub mod verify;
