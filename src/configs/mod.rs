pub mod badges;
pub mod base;
pub mod bot;
pub mod logging;
pub mod server;

pub use badges::*;
pub use base::*;
pub use bot::*;
pub use logging::*;
pub use server::*;
