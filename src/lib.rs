//! Two-player artillery duel kept in sync by deterministic replay
//!
//! Each peer owns a full replica of the match. Only player intent (`fire`)
//! and authoritative health (`damage`) cross the room channel; both sides
//! simulate every shell themselves.

pub mod app;
pub mod config;
pub mod game;
pub mod net;
pub mod store;
pub mod util;
