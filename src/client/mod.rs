mod active;
mod bot;
mod lock;
mod policy;
mod table_client;

pub use active::*;
pub use bot::*;
pub use lock::*;
pub use policy::*;
pub use table_client::*;
