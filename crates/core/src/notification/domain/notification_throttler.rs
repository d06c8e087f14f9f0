use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use super::identity::Identity;

/// Per-identity cooldown gate for notifications.
///
/// Remembers when each identity last produced an emitted event. The check
/// and the commit happen in one `&mut self` call, so two callers can never
/// both observe "not yet sent" for the same identity.
///
/// Keys are never evicted; the map is bounded by enrolled names plus one.
#[derive(Debug, Default)]
pub struct NotificationThrottler {
    last_emitted: HashMap<Identity, SystemTime>,
}

impl NotificationThrottler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `now` if at least `cooldown` has passed
    /// since the last emission for `identity` (or there was none).
    ///
    /// A clock that moved backwards counts as no time elapsed.
    pub fn should_emit(&mut self, identity: &Identity, now: SystemTime, cooldown: Duration) -> bool {
        if self.remaining_cooldown(identity, now, cooldown).is_some() {
            return false;
        }
        self.last_emitted.insert(identity.clone(), now);
        true
    }

    /// Time left before `identity` may emit again, or `None` if it may emit now.
    pub fn remaining_cooldown(
        &self,
        identity: &Identity,
        now: SystemTime,
        cooldown: Duration,
    ) -> Option<Duration> {
        let last = self.last_emitted.get(identity)?;
        let elapsed = now.duration_since(*last).unwrap_or(Duration::ZERO);
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }
}
