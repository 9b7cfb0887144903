mod ledger;
mod outcome;
mod table;

pub use ledger::*;
pub use outcome::*;
pub use table::*;
