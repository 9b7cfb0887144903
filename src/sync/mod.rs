mod context;
mod cue;
mod merge;

pub use context::*;
pub use cue::*;
pub use merge::*;
