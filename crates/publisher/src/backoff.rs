//! Bounded retry of channel joins.
use std::time::Duration;

use tokio::time::Instant;

use crate::channel::ChannelState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDecision {
    /// Send a JOIN now; the attempt has been recorded.
    Allow,
    /// Too many recent failures; do not try this channel yet.
    Block,
}

/// Per-channel join limiter: `max_attempts` tries, then nothing until
/// `memory_timeout` has passed since the last try.
#[derive(Debug, Clone, Copy)]
pub struct JoinBackoff {
    /// 0 disables the limit.
    pub max_attempts: u32,
    pub memory_timeout: Duration,
}

impl JoinBackoff {
    /// Decide whether `state` may be joined at `now`, recording the attempt
    /// when it is allowed.
    pub fn evaluate(&self, state: &mut ChannelState, now: Instant) -> JoinDecision {
        if self.max_attempts == 0 || state.join_attempts < self.max_attempts {
            state.join_attempts = state.join_attempts.saturating_add(1);
            state.last_join_attempt = Some(now);
            return JoinDecision::Allow;
        }

        let Some(last) = state.last_join_attempt else {
            state.last_join_attempt = Some(now);
            return JoinDecision::Block;
        };
        if now.saturating_duration_since(last) >= self.memory_timeout {
            state.join_attempts = 1;
            state.last_join_attempt = Some(now);
            JoinDecision::Allow
        } else {
            JoinDecision::Block
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKOFF: JoinBackoff = JoinBackoff {
        max_attempts: 3,
        memory_timeout: Duration::from_secs(100),
    };

    #[test]
    fn allows_up_to_max_then_blocks() {
        let now = Instant::now();
        let mut state = ChannelState::new("#chan");
        for attempt in 1..=3 {
            assert_eq!(BACKOFF.evaluate(&mut state, now), JoinDecision::Allow);
            assert_eq!(state.join_attempts(), attempt);
        }
        assert_eq!(BACKOFF.evaluate(&mut state, now), JoinDecision::Block);
        assert_eq!(state.join_attempts(), 3);
    }

    #[test]
    fn one_more_attempt_after_memory_timeout() {
        let start = Instant::now();
        let mut state = ChannelState::new("#chan");
        for _ in 0..3 {
            BACKOFF.evaluate(&mut state, start);
        }
        let almost = start + Duration::from_secs(99);
        assert_eq!(BACKOFF.evaluate(&mut state, almost), JoinDecision::Block);

        let later = start + Duration::from_secs(100);
        assert_eq!(BACKOFF.evaluate(&mut state, later), JoinDecision::Allow);
        assert_eq!(state.join_attempts(), 1);
        assert_eq!(state.last_join_attempt(), Some(later));

        // the counter restarted, so the usual budget applies again
        assert_eq!(BACKOFF.evaluate(&mut state, later), JoinDecision::Allow);
        assert_eq!(BACKOFF.evaluate(&mut state, later), JoinDecision::Allow);
        assert_eq!(BACKOFF.evaluate(&mut state, later), JoinDecision::Block);
    }

    #[test]
    fn exhausted_without_timestamp_blocks_and_stamps() {
        let now = Instant::now();
        let mut state = ChannelState::new("#chan");
        state.join_attempts = 3;
        assert_eq!(BACKOFF.evaluate(&mut state, now), JoinDecision::Block);
        assert_eq!(state.last_join_attempt(), Some(now));
    }

    #[test]
    fn zero_max_never_blocks() {
        let backoff = JoinBackoff {
            max_attempts: 0,
            ..BACKOFF
        };
        let now = Instant::now();
        let mut state = ChannelState::new("#chan");
        for _ in 0..50 {
            assert_eq!(backoff.evaluate(&mut state, now), JoinDecision::Allow);
        }
        assert_eq!(state.join_attempts(), 50);
    }
}
