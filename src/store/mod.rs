mod memory;
mod row;

pub use memory::*;
pub use row::*;
