use std::collections::VecDeque;

use {herald_irc::is_channel_name, tokio::time::Instant};

/// Membership and backlog of one destination.
#[derive(Debug, Clone)]
pub struct ChannelState {
    name: String,
    pub(crate) is_joined: bool,
    pub(crate) join_attempts: u32,
    pub(crate) last_join_attempt: Option<Instant>,
    pending: VecDeque<String>,
}

impl ChannelState {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_joined: false,
            join_attempts: 0,
            last_join_attempt: None,
            pending: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.is_joined
    }

    #[must_use]
    pub fn join_attempts(&self) -> u32 {
        self.join_attempts
    }

    #[must_use]
    pub fn last_join_attempt(&self) -> Option<Instant> {
        self.last_join_attempt
    }

    /// A multi-user channel we are not in yet. Private targets never need one.
    #[must_use]
    pub fn needs_join(&self) -> bool {
        !self.is_joined && is_channel_name(&self.name)
    }

    pub fn mark_joined(&mut self) {
        self.is_joined = true;
        self.join_attempts = 0;
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn push_back(&mut self, chunk: String) {
        self.pending.push_back(chunk);
    }

    /// Put a chunk back at the head, e.g. after a failed send.
    pub fn push_front(&mut self, chunk: String) {
        self.pending.push_front(chunk);
    }

    pub(crate) fn pop_front(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Nothing left to do and nothing to remember: the entry can go.
    pub(crate) fn is_idle(&self) -> bool {
        !self.is_joined && self.pending.is_empty()
    }
}
