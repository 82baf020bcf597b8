//! Domain models for the generic-finder engine.

mod entry;
mod matching;

pub use entry::*;
pub use matching::*;
