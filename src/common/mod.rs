pub mod errors;
pub mod logger;
pub mod readable;
pub mod types;

pub use errors::*;
pub use readable::readable;
pub use types::*;
