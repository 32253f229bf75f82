//! Memory management utilities used by the Tether VM.

pub mod arena;

pub use arena::{Arena, ArenaFull, ArenaHandle};
