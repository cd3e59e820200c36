//! Application orchestration

pub mod duel;

pub use duel::{run_self_play, DuelError, DuelReport};
