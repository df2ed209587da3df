//! WalkingSession - SessionRecorder bookkeeping
//!
//! Session metadata and the ordered chunk-key list.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Location;

/// Opaque identifier of a persisted chunk
///
/// Minted once per flush and never reused. The position of a key in the
/// session's list is the only record of chunk order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionChunkKey(String);

impl SessionChunkKey {
    /// Mint a fresh random key
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionChunkKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionChunkKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for SessionChunkKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One continuous recording interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkingSession {
    /// Start time (seconds since epoch)
    pub started_at: f64,

    /// Location polled at start
    pub start_location: Location,

    /// Keys of flushed chunks, in flush order
    pub chunk_keys: Vec<SessionChunkKey>,

    /// Whether the sensor stream is currently feeding this session
    pub active: bool,
}

impl WalkingSession {
    pub fn begin(started_at: f64, start_location: Location) -> Self {
        Self {
            started_at,
            start_location,
            chunk_keys: Vec::new(),
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_keys_are_unique() {
        let keys: HashSet<_> = (0..1000).map(|_| SessionChunkKey::generate()).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_key_serializes_as_plain_string() {
        let key = SessionChunkKey::from("ABC-123");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"ABC-123\"");
    }
}
