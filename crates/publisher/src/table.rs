//! Channel table and round-robin scheduler.
use std::{
    collections::{HashMap, hash_map::Entry},
    time::Duration,
};

use {herald_irc::channel_key, tokio::time::Instant, tracing::debug};

use crate::channel::ChannelState;

/// Join bookkeeping of a collected channel.
#[derive(Debug, Clone, Copy)]
struct JoinRecord {
    attempts: u32,
    last_attempt: Instant,
}

/// Channel states keyed by case-folded name, plus the insertion order used
/// for fairness.
///
/// Lookups accept any spelling of a name; the state keeps the spelling it was
/// created with, which is the one used on the wire. Every key in `order` has
/// an entry in `channels` and vice versa. Channels
/// that are neither joined nor have a backlog are removed; their join
/// attempts are kept aside for `memory_timeout` so that a blocked channel
/// stays blocked when it is referenced again.
#[derive(Debug)]
pub struct ChannelTable {
    channels: HashMap<String, ChannelState>,
    order: Vec<String>,
    /// Index in `order` where the next scan starts (wraps around).
    cursor: usize,
    join_memory: HashMap<String, JoinRecord>,
    memory_timeout: Duration,
}

impl ChannelTable {
    #[must_use]
    pub fn new(memory_timeout: Duration) -> Self {
        Self {
            channels: HashMap::new(),
            order: Vec::new(),
            cursor: 0,
            join_memory: HashMap::new(),
            memory_timeout,
        }
    }

    /// The entry for `name`, created (and appended to the rotation) if absent.
    pub fn get(&mut self, name: &str) -> &mut ChannelState {
        let key = channel_key(name);
        match self.channels.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut state = ChannelState::new(name);
                if let Some(record) = self.join_memory.remove(&key)
                    && record.last_attempt.elapsed() < self.memory_timeout
                {
                    state.join_attempts = record.attempts;
                    state.last_join_attempt = Some(record.last_attempt);
                }
                self.order.push(key);
                entry.insert(state)
            },
        }
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ChannelState> {
        self.channels.get(&channel_key(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut ChannelState> {
        self.channels.get_mut(&channel_key(name))
    }

    /// Drop `name` from the table; no-op for unknown names.
    pub fn remove(&mut self, name: &str) -> Option<ChannelState> {
        let key = channel_key(name);
        let state = self.channels.remove(&key)?;
        if let Some(index) = self.order.iter().position(|k| *k == key) {
            self.order.remove(index);
            if index < self.cursor {
                self.cursor -= 1;
            }
        }
        if !state.is_joined
            && state.join_attempts > 0
            && let Some(last_attempt) = state.last_join_attempt
        {
            self.join_memory.insert(key, JoinRecord {
                attempts: state.join_attempts,
                last_attempt,
            });
        }
        debug!(channel = state.name(), "channel removed from table");
        Some(state)
    }

    /// Mark `name` as no longer joined, collecting it when its backlog is empty.
    pub fn leave(&mut self, name: &str) {
        let Some(state) = self.lookup_mut(name) else {
            return;
        };
        state.is_joined = false;
        if !state.has_pending() {
            self.remove(name);
        }
    }

    /// [`leave`](Self::leave) every channel, e.g. after a disconnect.
    pub fn leave_all(&mut self) {
        for key in self.order.clone() {
            self.leave(&key);
        }
    }

    /// Pop the head of `name`'s backlog, collecting the channel if that left
    /// it idle.
    pub fn pop(&mut self, name: &str) -> Option<String> {
        let state = self.lookup_mut(name)?;
        let chunk = state.pop_front();
        if state.is_idle() {
            self.remove(name);
        }
        chunk
    }

    /// Next channel with a backlog, scanning circularly from the cursor.
    /// Returns the channel's wire spelling.
    ///
    /// The cursor moves just past the returned channel, so a channel with a
    /// continuous backlog cannot starve the others.
    pub fn find_waiting_channel(&mut self) -> Option<String> {
        let len = self.order.len();
        for step in 0..len {
            let index = (self.cursor + step) % len;
            if let Some(state) = self.channels.get(&self.order[index])
                && state.has_pending()
            {
                self.cursor = index + 1;
                return Some(state.name().to_string());
            }
        }
        None
    }

    /// Tracked channel names in rotation order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|key| self.channels.get(key))
            .map(|state| state.name().to_string())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Lines waiting across all channels.
    #[must_use]
    pub fn backlog_len(&self) -> usize {
        self.channels.values().map(ChannelState::pending_len).sum()
    }

    /// Forget join records older than the memory timeout.
    pub fn prune_join_memory(&mut self) {
        let timeout = self.memory_timeout;
        self.join_memory
            .retain(|_, record| record.last_attempt.elapsed() < timeout);
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        assert_eq!(self.order.len(), self.channels.len());
        for key in &self.order {
            let state = &self.channels[key];
            assert_eq!(*key, channel_key(state.name()));
            assert!(!state.is_idle(), "{key} is idle but still tracked");
        }
        assert!(self.cursor <= self.order.len());
    }
}
