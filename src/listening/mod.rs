pub mod registry;

pub use registry::{FlushReport, ListeningRegistry, Stopped};
