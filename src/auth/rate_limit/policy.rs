use std::collections::HashMap;
use std::time::Duration;

/// Limits for one rate-limited action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_attempts: usize,
    pub window: Duration,
    pub block_duration: Duration,
}

impl RateLimitPolicy {
    pub const LOGIN: RateLimitPolicy = RateLimitPolicy {
        max_attempts: 3,
        window: Duration::from_secs(15 * 60),
        block_duration: Duration::from_secs(30 * 60),
    };

    pub const REGISTRATION: RateLimitPolicy = RateLimitPolicy {
        max_attempts: 3,
        window: Duration::from_secs(60 * 60),
        block_duration: Duration::from_secs(60 * 60),
    };

    pub const PASSWORD_RESET: RateLimitPolicy = RateLimitPolicy {
        max_attempts: 3,
        window: Duration::from_secs(15 * 60),
        block_duration: Duration::from_secs(30 * 60),
    };

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    pub fn block_ms(&self) -> i64 {
        self.block_duration.as_millis() as i64
    }

    /// Whether an attempt made at `timestamp` still counts at `now`.
    pub fn in_window(&self, timestamp: i64, now: i64) -> bool {
        now - timestamp < self.window_ms()
    }
}

/// Policies per action key. Unknown keys fall back to the login policy.
#[derive(Debug, Clone)]
pub struct LimiterPolicies {
    by_key: HashMap<String, RateLimitPolicy>,
    fallback: RateLimitPolicy,
}

impl LimiterPolicies {
    pub fn defaults() -> Self {
        Self::uniform(RateLimitPolicy::LOGIN)
            .with("login", RateLimitPolicy::LOGIN)
            .with("registration", RateLimitPolicy::REGISTRATION)
            .with("password_reset", RateLimitPolicy::PASSWORD_RESET)
    }

    /// Every key gets `policy`.
    pub fn uniform(policy: RateLimitPolicy) -> Self {
        Self {
            by_key: HashMap::new(),
            fallback: policy,
        }
    }

    pub fn with(mut self, key: &str, policy: RateLimitPolicy) -> Self {
        self.by_key.insert(key.to_string(), policy);
        self
    }

    pub fn get(&self, key: &str) -> &RateLimitPolicy {
        self.by_key.get(key).unwrap_or(&self.fallback)
    }

    /// Whether `key` has its own policy (rather than the fallback).
    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }
}

impl Default for LimiterPolicies {
    fn default() -> Self {
        Self::defaults()
    }
}
