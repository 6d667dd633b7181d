//! Boundary to the realtime result relay.
//!
//! One client (whichever resolves first) publishes a round's result to a
//! channel keyed by prize id; every other holder of tickets for that round
//! observes it without polling the authoritative source. Messages are fenced
//! by the round-version token so a stale round's late write can never
//! satisfy a listener waiting on a newer round.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use sweepdraw_common::wire::RelayMessage;
use sweepdraw_common::DrawStatus;
use thiserror::Error;

use crate::state::Env;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelayError {
    #[error("relay channel unavailable: {reason}")]
    Unavailable { reason: String },
}

pub trait ResultRelay {
    /// Publish a round's result. Implementations must discard writes
    /// carrying an older round version than the one already stored for the
    /// prize — the newer result stands.
    fn publish(&mut self, message: &RelayMessage) -> Result<(), RelayError>;

    /// Latest message for a prize, if any.
    fn latest(&self, prize_id: u64) -> Option<RelayMessage>;
}

/// In-process relay used by tests and single-device runs.
#[derive(Default, Debug)]
pub struct MemoryRelay {
    channels: HashMap<u64, RelayMessage>,
}

impl ResultRelay for MemoryRelay {
    fn publish(&mut self, message: &RelayMessage) -> Result<(), RelayError> {
        match self.channels.get(&message.prize_id) {
            Some(existing) if existing.round_version > message.round_version => Ok(()),
            _ => {
                self.channels.insert(message.prize_id, message.clone());
                Ok(())
            }
        }
    }

    fn latest(&self, prize_id: u64) -> Option<RelayMessage> {
        self.channels.get(&prize_id).cloned()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RelayPoll {
    Ready(RelayMessage),
    Pending,
    /// Deadline passed; the caller should query the authoritative source
    /// directly instead of waiting longer.
    TimedOut,
    Cancelled,
}

/// A bounded, cancellable wait for one specific round's result.
#[derive(Debug)]
pub struct RelayListener {
    prize_id: u64,
    round_version: u64,
    deadline: DateTime<Utc>,
    cancelled: bool,
}

impl RelayListener {
    pub fn open(prize_id: u64, round_version: u64, env: &Env, wait_seconds: i64) -> Self {
        RelayListener {
            prize_id,
            round_version,
            deadline: env.now + Duration::seconds(wait_seconds),
            cancelled: false,
        }
    }

    /// Unsubscribe, e.g. on screen unmount or when a newer round supersedes
    /// this one. A delivery racing with cancellation is still discarded.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn round_version(&self) -> u64 {
        self.round_version
    }

    /// Check the relay once. A message for a different round is not an
    /// error — it is silently ignored and the wait continues.
    pub fn poll(&self, relay: &dyn ResultRelay, env: &Env) -> RelayPoll {
        if self.cancelled {
            return RelayPoll::Cancelled;
        }
        if let Some(message) = relay.latest(self.prize_id) {
            if message.round_version == self.round_version
                && message.status == DrawStatus::Completed
            {
                return RelayPoll::Ready(message);
            }
        }
        if env.now > self.deadline {
            RelayPoll::TimedOut
        } else {
            RelayPoll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn env() -> Env {
        Env::at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
    }

    fn message(prize_id: u64, round_version: u64, winning_number: u32) -> RelayMessage {
        RelayMessage {
            prize_id,
            winning_number,
            status: DrawStatus::Completed,
            round_version,
            extracted_at: env().now,
        }
    }

    #[test]
    fn test_listener_matches_its_round_only() {
        let mut relay = MemoryRelay::default();
        let listener = RelayListener::open(4, 2000, &env(), 5);

        // A different round's message never satisfies the listener
        relay.publish(&message(4, 1000, 7)).unwrap();
        assert_eq!(listener.poll(&relay, &env()), RelayPoll::Pending);

        relay.publish(&message(4, 2000, 17)).unwrap();
        match listener.poll(&relay, &env()) {
            RelayPoll::Ready(msg) => assert_eq!(msg.winning_number, 17),
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_publish_never_overwrites_newer_round() {
        let mut relay = MemoryRelay::default();
        relay.publish(&message(4, 2000, 17)).unwrap();
        // Late write from the superseded round
        relay.publish(&message(4, 1000, 7)).unwrap();

        let latest = relay.latest(4).unwrap();
        assert_eq!(latest.round_version, 2000);
        assert_eq!(latest.winning_number, 17);
    }

    #[test]
    fn test_listener_times_out_after_deadline() {
        let relay = MemoryRelay::default();
        let listener = RelayListener::open(4, 2000, &env(), 5);

        assert_eq!(listener.poll(&relay, &env()), RelayPoll::Pending);

        let late = Env::at(env().now + Duration::seconds(6));
        assert_eq!(listener.poll(&relay, &late), RelayPoll::TimedOut);
    }

    #[test]
    fn test_cancel_wins_over_racing_delivery() {
        let mut relay = MemoryRelay::default();
        let mut listener = RelayListener::open(4, 2000, &env(), 5);

        listener.cancel();
        relay.publish(&message(4, 2000, 17)).unwrap();
        assert_eq!(listener.poll(&relay, &env()), RelayPoll::Cancelled);
    }
}
