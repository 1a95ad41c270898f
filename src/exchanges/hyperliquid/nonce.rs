use chrono::Utc;
use std::sync::Mutex;

/// Issues the strictly increasing nonces the exchange requires per identity.
///
/// The value is the wall clock in milliseconds, bumped past the previous
/// issue when two callers land in the same millisecond. Issuance is
/// serialized behind a single lock so concurrent submissions can never
/// observe the same reading.
#[derive(Debug, Default)]
pub struct NonceSequencer {
    last: Mutex<u64>,
}

impl NonceSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let mut last = self.last.lock().expect("nonce lock poisoned");
        let now = Utc::now().timestamp_millis() as u64;
        let next = now.max(*last + 1);
        *last = next;
        next
    }
}
