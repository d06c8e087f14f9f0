use std::time::{SystemTime, UNIX_EPOCH};

use super::identity::Identity;

/// A recognition that passed the throttle and is handed to sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionEvent {
    pub identity: Identity,
    pub score: f32,
    pub timestamp: SystemTime,
}

impl RecognitionEvent {
    pub fn new(identity: Identity, score: f32, timestamp: SystemTime) -> Self {
        Self {
            identity,
            score,
            timestamp,
        }
    }

    pub fn unix_seconds(&self) -> u64 {
        unix_seconds(self.timestamp)
    }
}

/// Whole seconds since the Unix epoch; pre-epoch clocks report 0.
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
