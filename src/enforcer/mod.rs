mod correction;
mod enforcer;

pub use correction::*;
pub use enforcer::*;
