pub mod driver;
pub mod handler;
pub mod messages;

pub use driver::BridgeDriver;
pub use handler::gateway_handler;
pub use messages::{BridgeInbound, BridgeOutbound};
