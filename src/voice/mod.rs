pub mod controller;
pub mod driver;
pub mod events;
pub mod roster;


pub use controller::{Action, Controller, GuildState, plan_follow, plan_retarget};
pub use driver::{ChatSink, VoiceDriver};
pub use events::{GatewayEvent, MemberVoiceState, VoiceState, VoiceStateChange};
pub use roster::{Roster, RosterEntry};
