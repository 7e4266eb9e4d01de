//! Core data models.

mod game;
mod record;

pub use game::*;
pub use record::*;
