pub mod live;
pub mod scores;
