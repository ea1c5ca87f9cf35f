//! Channel configuration for progress event delivery.

use std::time::Duration;

/// Configuration for the event channel between a load invocation and its
/// observer.
#[derive(Debug, Clone)]
pub struct ProgressChannelConfig {
    /// Maximum buffer size before events start getting dropped. Zero means
    /// unbounded.
    pub maximum_buffer_size: usize,
    /// Timeout for send operations.
    pub send_timeout: Option<Duration>,
    /// Whether to apply backpressure or drop events when the buffer fills.
    pub enable_backpressure: bool,
}

impl Default for ProgressChannelConfig {
    fn default() -> Self {
        Self {
            maximum_buffer_size: 0,
            send_timeout: Some(Duration::from_millis(100)),
            enable_backpressure: false,
        }
    }
}
