//! Per-profile attempt ledger that throttles repeated form submissions.
//!
//! Each action key (`login`, `registration`, ...) owns a sliding-window list of
//! attempt timestamps and an optional block marker, both kept in the client
//! state store. The limiter is advisory: when the store fails it logs and lets
//! the submission through.

pub mod clock;
pub mod countdown;
pub mod policy;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::storage::{self, ClientStore, ProfileId, StateStore, StorageError, StorageKey};

pub use clock::{Clock, ManualClock, SystemClock};
pub use countdown::{Countdown, CountdownEvent, Tick, run_countdown};
pub use policy::{LimiterPolicies, RateLimitPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMarker {
    pub expires_at: i64,
}

impl BlockMarker {
    pub fn is_active(&self, now: i64) -> bool {
        now < self.expires_at
    }

    /// Whole seconds until the block lifts, rounded up.
    pub fn remaining_secs(&self, now: i64) -> u64 {
        let ms = (self.expires_at - now).max(0) as u64;
        ms.div_ceil(1000)
    }
}

/// Derived limiter state for one action key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub attempts: usize,
    pub is_blocked: bool,
    pub time_remaining: u64,
    pub can_submit: bool,
}

impl RateLimitStatus {
    pub fn open(attempts: usize) -> Self {
        Self {
            attempts,
            is_blocked: false,
            time_remaining: 0,
            can_submit: true,
        }
    }

    pub fn blocked(attempts: usize, time_remaining: u64) -> Self {
        Self {
            attempts,
            is_blocked: true,
            time_remaining,
            can_submit: false,
        }
    }
}

type KeyLock = Arc<tokio::sync::Mutex<()>>;

pub struct RateLimiter<S = ClientStore> {
    store: S,
    clock: Arc<dyn Clock>,
    policies: LimiterPolicies,
    /// One lock per (profile, key) so a ledger's read-modify-write never interleaves.
    locks: Mutex<HashMap<(ProfileId, String), KeyLock>>,
}

impl<S: StateStore> RateLimiter<S> {
    pub fn new(store: S, policies: LimiterPolicies) -> Self {
        Self::with_clock(store, policies, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, policies: LimiterPolicies, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policies,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn key_lock(&self, profile: &ProfileId, key: &str) -> KeyLock {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Drop locks nobody holds or waits on.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry((profile.clone(), key.to_string()))
            .or_default()
            .clone()
    }

    /// Append an attempt for `key` and start a block if the window is now full.
    /// A block that is already running is left untouched.
    pub async fn record_attempt(&self, profile: &ProfileId, key: &str) {
        let lock = self.key_lock(profile, key);
        let _guard = lock.lock().await;
        if let Err(e) = self.try_record(profile, key).await {
            log::warn!("Rate limiter: could not record '{key}' attempt: {e}");
        }
    }

    /// Recompute the status of `key`, pruning attempts that left the window.
    /// Falls back to an open status when the store is unavailable.
    pub async fn check_status(&self, profile: &ProfileId, key: &str) -> RateLimitStatus {
        let lock = self.key_lock(profile, key);
        let _guard = lock.lock().await;
        match self.try_check(profile, key).await {
            Ok(status) => status,
            Err(e) => {
                log::warn!("Rate limiter: status for '{key}' unavailable, allowing: {e}");
                RateLimitStatus::open(0)
            }
        }
    }

    /// Forget every attempt and any block for `key`.
    pub async fn reset(&self, profile: &ProfileId, key: &str) {
        let ledger = StorageKey::RateLimit(key.to_string());
        let block = StorageKey::RateLimitBlock(key.to_string());
        let lock = self.key_lock(profile, key);
        let _guard = lock.lock().await;
        if let Err(e) = self.store.remove(profile, &ledger).await {
            log::warn!("Rate limiter: could not clear '{key}' ledger: {e}");
        }
        if let Err(e) = self.store.remove(profile, &block).await {
            log::warn!("Rate limiter: could not clear '{key}' block: {e}");
        }
    }

    async fn try_record(&self, profile: &ProfileId, key: &str) -> Result<(), StorageError> {
        let now = self.clock.now_ms();
        let policy = self.policies.get(key);

        let mut attempts = self.load_attempts(profile, key).await?;
        attempts.push(AttemptRecord { timestamp: now });
        self.save_attempts(profile, key, &attempts).await?;

        if let Some(marker) = self.load_block(profile, key).await? {
            if marker.is_active(now) {
                return Ok(());
            }
        }

        let recent = attempts
            .iter()
            .filter(|a| policy.in_window(a.timestamp, now))
            .count();
        if recent >= policy.max_attempts {
            self.start_block(profile, key, now, policy).await?;
        }
        Ok(())
    }

    async fn try_check(&self, profile: &ProfileId, key: &str) -> Result<RateLimitStatus, StorageError> {
        let now = self.clock.now_ms();
        let policy = self.policies.get(key);

        let stored = self.load_attempts(profile, key).await?;
        let recent: Vec<AttemptRecord> = stored
            .iter()
            .copied()
            .filter(|a| policy.in_window(a.timestamp, now))
            .collect();
        if recent.len() != stored.len() {
            self.save_attempts(profile, key, &recent).await?;
        }
        let attempts = recent.len();

        match self.load_block(profile, key).await? {
            Some(marker) if marker.is_active(now) => {
                return Ok(RateLimitStatus::blocked(attempts, marker.remaining_secs(now)));
            }
            Some(_) => {
                self.store
                    .remove(profile, &StorageKey::RateLimitBlock(key.to_string()))
                    .await?;
            }
            None => {}
        }

        if attempts >= policy.max_attempts {
            let marker = self.start_block(profile, key, now, policy).await?;
            return Ok(RateLimitStatus::blocked(attempts, marker.remaining_secs(now)));
        }

        Ok(RateLimitStatus::open(attempts))
    }

    async fn start_block(
        &self,
        profile: &ProfileId,
        key: &str,
        now: i64,
        policy: &RateLimitPolicy,
    ) -> Result<BlockMarker, StorageError> {
        let marker = BlockMarker {
            expires_at: now + policy.block_ms(),
        };
        storage::save_json(
            &self.store,
            profile,
            &StorageKey::RateLimitBlock(key.to_string()),
            &marker,
        )
        .await?;
        log::warn!(
            "Rate limiter: '{key}' blocked for profile {profile} ({}s)",
            policy.block_duration.as_secs()
        );
        Ok(marker)
    }

    /// Read a JSON value, discarding it when it no longer decodes.
    async fn load_or_repair<T: DeserializeOwned>(
        &self,
        profile: &ProfileId,
        key: &StorageKey,
    ) -> Result<Option<T>, StorageError> {
        match storage::load_json(&self.store, profile, key).await {
            Err(StorageError::Json(e)) => {
                log::warn!(
                    "Rate limiter: dropping unreadable '{}' for profile {profile}: {e}",
                    key.name()
                );
                self.store.remove(profile, key).await?;
                Ok(None)
            }
            other => other,
        }
    }

    async fn load_attempts(&self, profile: &ProfileId, key: &str) -> Result<Vec<AttemptRecord>, StorageError> {
        let ledger = StorageKey::RateLimit(key.to_string());
        Ok(self.load_or_repair(profile, &ledger).await?.unwrap_or_default())
    }

    async fn save_attempts(
        &self,
        profile: &ProfileId,
        key: &str,
        attempts: &[AttemptRecord],
    ) -> Result<(), StorageError> {
        let ledger = StorageKey::RateLimit(key.to_string());
        if attempts.is_empty() {
            self.store.remove(profile, &ledger).await
        } else {
            storage::save_json(&self.store, profile, &ledger, &attempts).await
        }
    }

    async fn load_block(&self, profile: &ProfileId, key: &str) -> Result<Option<BlockMarker>, StorageError> {
        self.load_or_repair(profile, &StorageKey::RateLimitBlock(key.to_string()))
            .await
    }
}
