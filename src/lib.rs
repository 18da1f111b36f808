pub mod commands;
pub mod common;
pub mod configs;
pub mod jobs;
pub mod ledger;
pub mod listening;
pub mod playback;
pub mod server;
pub mod transport;
pub mod voice;
