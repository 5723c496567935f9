use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use super::{RateLimitStatus, RateLimiter};
use crate::storage::{ProfileId, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Remaining(u64),
    Expired,
}

/// Visible block countdown. Driven by the clock, one tick per second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
}

impl Countdown {
    /// `None` when the status is not blocked.
    pub fn from_status(status: &RateLimitStatus) -> Option<Self> {
        (status.is_blocked && status.time_remaining > 0).then_some(Self {
            remaining: status.time_remaining,
        })
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn tick(&mut self) -> Tick {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            Tick::Expired
        } else {
            Tick::Remaining(self.remaining)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CountdownEvent {
    Tick { time_remaining: u64 },
    Status(RateLimitStatus),
}

/// Push a tick every second while `key` is blocked, re-checking the ledger
/// whenever the countdown reaches zero. Ends with the final status, or early
/// when the receiver goes away.
pub async fn run_countdown<S: StateStore>(
    limiter: &RateLimiter<S>,
    profile: &ProfileId,
    key: &str,
    events: mpsc::Sender<CountdownEvent>,
) {
    let mut status = limiter.check_status(profile, key).await;
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await;

    while let Some(mut countdown) = Countdown::from_status(&status) {
        if events
            .send(CountdownEvent::Tick {
                time_remaining: countdown.remaining(),
            })
            .await
            .is_err()
        {
            return;
        }
        loop {
            interval.tick().await;
            match countdown.tick() {
                Tick::Remaining(secs) => {
                    let event = CountdownEvent::Tick { time_remaining: secs };
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
                Tick::Expired => break,
            }
        }
        status = limiter.check_status(profile, key).await;
    }

    let _ = events.send(CountdownEvent::Status(status)).await;
}
