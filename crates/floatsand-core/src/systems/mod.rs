//! Systems - per-step logic over the NPC world and its substrate

mod humans;
mod integration;
mod waterness;

pub use humans::*;
pub use integration::*;
pub use waterness::*;
