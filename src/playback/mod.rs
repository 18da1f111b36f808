pub mod session;
pub mod source;

pub use session::{MAX_TEMPO, MIN_TEMPO, PlaybackSession, Target, validate_tempo};
pub use source::{AudioAsset, AudioSource, seek_position, tempo_filter};
