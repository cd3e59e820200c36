//! Match history records

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{MatchResult, WinReason};
use crate::net::protocol::PlayerIndex;

/// One finished match as stored in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: Uuid,
    pub winner: PlayerIndex,
    pub loser: PlayerIndex,
    pub win_reason: WinReason,
    /// Shots fired as seen by the recording peer
    pub shots_fired: u32,
    pub recorded_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn new(match_id: Uuid, result: MatchResult, shots_fired: u32) -> Self {
        Self {
            match_id,
            winner: result.winner,
            loser: result.loser(),
            win_reason: result.reason,
            shots_fired,
            recorded_at: Utc::now(),
        }
    }
}

/// Which peer writes the record, so each match is stored once. Knockouts are
/// seen by both peers and left to the host; a disconnect is only seen by
/// the peer that stayed.
pub fn should_record(result: &MatchResult, local: PlayerIndex) -> bool {
    match result.reason {
        WinReason::Knockout => local == PlayerIndex::One,
        WinReason::Disconnect => result.winner == local,
    }
}

/// Sink for finished matches. Persistent storage lives outside this crate.
pub trait MatchRecorder: Send + Sync {
    fn record(&self, record: MatchRecord) -> Result<(), RecordError>;
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<MatchRecord>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<MatchRecord> {
        self.records.lock().clone()
    }
}

impl MatchRecorder for MemoryRecorder {
    fn record(&self, record: MatchRecord) -> Result<(), RecordError> {
        let mut records = self.records.lock();
        if records.iter().any(|r| r.match_id == record.match_id) {
            return Err(RecordError::Duplicate(record.match_id));
        }
        records.push(record);
        Ok(())
    }
}

/// Record store errors
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Match {0} already recorded")]
    Duplicate(Uuid),
}
