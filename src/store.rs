//! In-memory token state: outstanding refresh tokens and the access-token
//! blacklist.
//!
//! The store is the only mutable shared state in the auth path. Refresh
//! records are keyed by user id (at most one live record per user) and the
//! blacklist is keyed by access-token jti. Both maps are sharded
//! (`DashMap`), so operations for different users never serialize on a
//! global lock, while operations for the same key go through the same shard
//! entry and are linearizable.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::{SystemTime, UNIX_EPOCH};

/// The stored refresh token for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRecord {
    /// jti of the currently valid refresh token
    pub jti: String,
    /// Natural expiry of the token (Unix seconds)
    pub expires_at: u64,
}

/// Outcome of a failed refresh-token rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateError {
    /// No live record for the user (logged out or expired)
    NotFound,
    /// Presented jti does not match the stored one; the record has been
    /// force-removed because reuse of a rotated-out token signals theft
    Mismatch,
}

/// Store for refresh-token records and revoked access tokens.
pub struct TokenStore {
    refresh: DashMap<i64, RefreshRecord>,
    blacklist: DashMap<String, u64>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self {
            refresh: DashMap::new(),
            blacklist: DashMap::new(),
        }
    }

    /// Store the refresh record for a user, overwriting any existing one.
    /// This is what keeps the at-most-one-live-refresh-token invariant.
    pub fn put_refresh(&self, user_id: i64, record: RefreshRecord) {
        self.refresh.insert(user_id, record);
    }

    /// Get the live refresh record for a user. Expired records count as
    /// absent and are dropped on the way out.
    pub fn get_refresh(&self, user_id: i64) -> Option<RefreshRecord> {
        let now = unix_now();
        let expired = match self.refresh.get(&user_id) {
            None => return None,
            Some(record) if record.expires_at > now => return Some(record.clone()),
            Some(_) => true,
        };
        if expired {
            self.refresh.remove(&user_id);
        }
        None
    }

    /// Delete the refresh record for a user. Idempotent; returns whether a
    /// record was present.
    pub fn delete_refresh(&self, user_id: i64) -> bool {
        self.refresh.remove(&user_id).is_some()
    }

    /// Atomically replace the user's refresh record, but only if the stored
    /// jti matches the presented one. A mismatch removes the record
    /// entirely: someone replayed a rotated-out token, so the whole session
    /// is invalidated.
    ///
    /// The compare-and-swap runs under the entry lock for the user's key,
    /// so a concurrent rotation or logout for the same user serializes with
    /// this call and exactly one outcome wins.
    pub fn rotate(
        &self,
        user_id: i64,
        presented_jti: &str,
        next: RefreshRecord,
    ) -> Result<(), RotateError> {
        let now = unix_now();
        match self.refresh.entry(user_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().expires_at <= now {
                    entry.remove();
                    return Err(RotateError::NotFound);
                }
                if entry.get().jti != presented_jti {
                    entry.remove();
                    return Err(RotateError::Mismatch);
                }
                entry.insert(next);
                Ok(())
            }
            Entry::Vacant(_) => Err(RotateError::NotFound),
        }
    }

    /// Add an access-token jti to the blacklist until its natural expiry.
    /// Idempotent.
    pub fn revoke(&self, jti: &str, expires_at: u64) {
        self.blacklist.insert(jti.to_string(), expires_at);
    }

    /// Check whether an access-token jti has been revoked. Entries past
    /// their expiry no longer matter (validation rejects the token anyway)
    /// and are dropped lazily.
    pub fn is_revoked(&self, jti: &str) -> bool {
        let now = unix_now();
        let expired = match self.blacklist.get(jti) {
            None => return false,
            Some(expires_at) => *expires_at <= now,
        };
        if expired {
            self.blacklist.remove(jti);
        }
        !expired
    }

    /// Drop all expired refresh records and blacklist entries. Returns
    /// (refresh purged, blacklist purged).
    pub fn purge_expired(&self) -> (usize, usize) {
        let now = unix_now();
        let refresh_before = self.refresh.len();
        let blacklist_before = self.blacklist.len();
        self.refresh.retain(|_, record| record.expires_at > now);
        self.blacklist.retain(|_, expires_at| *expires_at > now);
        (
            refresh_before - self.refresh.len(),
            blacklist_before - self.blacklist.len(),
        )
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
