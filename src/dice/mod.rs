mod die;
mod result;
mod variant;

pub use die::*;
pub use result::*;
pub use variant::*;
