//! Match history storage

pub mod records;

pub use records::{should_record, MatchRecord, MatchRecorder, MemoryRecorder, RecordError};
