pub mod app_state;
pub mod event_loop;

pub use app_state::AppState;
pub use event_loop::{dispatch, run_event_loop};
