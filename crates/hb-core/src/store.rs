//! Storage boundary for processed heartbeats.

use crate::heartbeat::Heartbeat;

/// A repository keyed by heartbeat fingerprint.
///
/// Implementations must make `insert` an atomic insert-if-absent on
/// [`Heartbeat::hash`]; the fingerprint is what makes duplicate suppression
/// possible, but mutual exclusion is the store's job.
pub trait HeartbeatStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stores `heartbeat` unless one with the same hash exists.
    ///
    /// Returns `Ok(false)` for a duplicate; that is not an error.
    fn insert(&mut self, heartbeat: &Heartbeat) -> Result<bool, Self::Error>;

    /// Stores a batch, skipping duplicates, and returns how many were written.
    ///
    /// Stores with transactions should override this to write the batch
    /// atomically.
    fn insert_all(&mut self, heartbeats: &[Heartbeat]) -> Result<usize, Self::Error> {
        let mut inserted = 0;
        for heartbeat in heartbeats {
            if self.insert(heartbeat)? {
                inserted += 1;
            } else {
                tracing::debug!(hash = %heartbeat.hash, "skipping duplicate heartbeat");
            }
        }
        Ok(inserted)
    }

    /// Looks up a stored heartbeat by fingerprint.
    fn find_by_hash(&self, hash: &str) -> Result<Option<Heartbeat>, Self::Error>;
}
