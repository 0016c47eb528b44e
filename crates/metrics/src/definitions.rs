//! Metric name and label definitions.
//!
//! All metric names recorded by herald live here so the exported set is
//! documented in one place.

/// Publishing engine metrics
pub mod publisher {
    /// Messages accepted into the inbox
    pub const MESSAGES_RECEIVED_TOTAL: &str = "herald_publisher_messages_received_total";
    /// Messages rejected at the handle (bad channel name)
    pub const MESSAGES_REJECTED_TOTAL: &str = "herald_publisher_messages_rejected_total";
    /// Chunks written to the IRC connection
    pub const CHUNKS_SENT_TOTAL: &str = "herald_publisher_chunks_sent_total";
    /// Backlogs moved to the fallback channel
    pub const REROUTES_TOTAL: &str = "herald_publisher_reroutes_total";
    /// Backlog lines discarded, labelled by `reason`
    pub const LINES_DROPPED_TOTAL: &str = "herald_publisher_lines_dropped_total";
    /// JOIN commands sent
    pub const JOIN_ATTEMPTS_TOTAL: &str = "herald_publisher_join_attempts_total";
    /// Successful connections (welcome received)
    pub const CONNECTIONS_TOTAL: &str = "herald_publisher_connections_total";
    /// Lost or failed connections
    pub const DISCONNECTIONS_TOTAL: &str = "herald_publisher_disconnections_total";
    /// 1 while the engine is registered with the server
    pub const CONNECTED: &str = "herald_publisher_connected";
    /// Channels currently tracked in the table
    pub const CHANNELS_TRACKED: &str = "herald_publisher_channels_tracked";
    /// Lines waiting in all backlogs
    pub const BACKLOG_LINES: &str = "herald_publisher_backlog_lines";
}

/// Inbound listener metrics
pub mod listener {
    /// Accepted client connections
    pub const CONNECTIONS_TOTAL: &str = "herald_listener_connections_total";
    /// Client connections currently open
    pub const CONNECTIONS_ACTIVE: &str = "herald_listener_connections_active";
    /// Lines received from clients
    pub const LINES_TOTAL: &str = "herald_listener_lines_total";
    /// Lines rejected, labelled by `reason`
    pub const LINES_REJECTED_TOTAL: &str = "herald_listener_lines_rejected_total";
}

/// Common label keys
pub mod labels {
    pub const REASON: &str = "reason";
}
