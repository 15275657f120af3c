use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Suppressed,
}

/// Per-payload cooldown filter. The camera loop runs at frame rate, so a
/// single physical scan is visible across tens of consecutive frames; the
/// gate collapses those into one admission per cooldown window.
///
/// State lives for one scanning session and is never persisted. Stamping
/// happens at admission, before the downstream ledger write, so a slow or
/// failing commit cannot trigger an immediate re-fire storm.
pub struct DebounceGate {
    cooldown: Duration,
    last_fire: HashMap<String, DateTime<Utc>>,
}

impl DebounceGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fire: HashMap::new(),
        }
    }

    /// `Allowed` iff the payload has never fired or its last fire is at
    /// least one cooldown in the past. Suppressed admissions do not restamp,
    /// so a code held in front of the camera re-fires once per cooldown.
    pub fn admit(&mut self, payload: &str, now: DateTime<Utc>) -> Admission {
        match self.last_fire.get(payload) {
            Some(&last) if now - last < self.cooldown => Admission::Suppressed,
            _ => {
                self.last_fire.insert(payload.to_string(), now);
                Admission::Allowed
            }
        }
    }

    pub fn tracked_payloads(&self) -> usize {
        self.last_fire.len()
    }
}
