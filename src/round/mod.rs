mod phase;
mod player;
mod state;

pub use phase::*;
pub use player::*;
pub use state::*;
