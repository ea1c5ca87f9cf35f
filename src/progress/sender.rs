//! Buffered async sender for load events.

use std::sync::{Arc, Mutex};

use tokio::time;
use tracing::trace;

use super::receiver::LoadEventReceiver;
use super::types::ProgressChannelConfig;
use super::LoadEvent;

/// Error types for send operations.
#[derive(Debug, Clone)]
pub enum SendEventError {
    /// Channel has been closed (the receiver was dropped).
    ChannelClosed,
    /// Send operation timed out.
    Timeout,
}

/// Sender half of the progress channel, with optional buffering and a
/// dropped-event counter.
#[derive(Clone)]
pub struct LoadEventSender {
    sender: async_channel::Sender<LoadEvent>,
    config: ProgressChannelConfig,
    dropped_events: Arc<Mutex<u64>>,
}

impl LoadEventSender {
    /// Create a connected (sender, receiver) pair with the given
    /// configuration.
    pub fn new(config: ProgressChannelConfig) -> (Self, LoadEventReceiver) {
        let buffer_size = if config.enable_backpressure {
            config.maximum_buffer_size
        } else {
            // For non-backpressure mode, use an unbounded channel
            0
        };

        let (sender, receiver) = if buffer_size > 0 {
            async_channel::bounded(buffer_size)
        } else {
            async_channel::unbounded()
        };

        let event_sender = Self {
            sender,
            config,
            dropped_events: Arc::new(Mutex::new(0)),
        };
        let event_receiver = LoadEventReceiver::new(receiver);

        (event_sender, event_receiver)
    }

    /// Send an event asynchronously, honoring the configured timeout.
    pub async fn send_event(&self, event: LoadEvent) -> Result<(), SendEventError> {
        match self.config.send_timeout {
            Some(timeout) => match time::timeout(timeout, self.sender.send(event)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(_)) => Err(SendEventError::ChannelClosed),
                Err(_) => {
                    if !self.config.enable_backpressure {
                        self.increment_dropped_events();
                    }
                    Err(SendEventError::Timeout)
                }
            },
            None => self
                .sender
                .send(event)
                .await
                .map_err(|_| SendEventError::ChannelClosed),
        }
    }

    /// Send an event, dropping it silently when nobody listens.
    ///
    /// Pipeline stages use this: an observer-less load must still run to
    /// completion.
    pub async fn emit(&self, event: LoadEvent) {
        match self.send_event(event).await {
            Ok(()) => {}
            Err(SendEventError::ChannelClosed) => {
                trace!("progress event dropped, receiver gone");
                self.increment_dropped_events();
            }
            // Timed-out sends were already counted by send_event.
            Err(SendEventError::Timeout) => {
                trace!("progress event dropped on timeout");
            }
        }
    }

    /// Try to send an event without blocking.
    pub fn try_send_event(&self, event: LoadEvent) -> Result<(), SendEventError> {
        match self.sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(async_channel::TrySendError::Full(_)) => {
                if !self.config.enable_backpressure {
                    self.increment_dropped_events();
                }
                Err(SendEventError::Timeout)
            }
            Err(async_channel::TrySendError::Closed(_)) => Err(SendEventError::ChannelClosed),
        }
    }

    /// Number of events dropped so far.
    pub fn dropped_events_count(&self) -> u64 {
        self.dropped_events.lock().map(|count| *count).unwrap_or(0)
    }

    /// Whether the receiver side has been dropped.
    pub fn is_channel_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Approximate number of events waiting in the channel.
    pub fn pending_events_count(&self) -> usize {
        self.sender.len()
    }

    pub fn configuration(&self) -> &ProgressChannelConfig {
        &self.config
    }

    fn increment_dropped_events(&self) {
        if let Ok(mut count) = self.dropped_events.lock() {
            *count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::LoadPhase;

    #[tokio::test]
    async fn test_send_and_receive_event() {
        let (sender, receiver) = LoadEventSender::new(ProgressChannelConfig::default());
        sender
            .send_event(LoadEvent::PhaseChanged(LoadPhase::Materializing))
            .await
            .unwrap();

        match receiver.receive_event().await.unwrap() {
            LoadEvent::PhaseChanged(phase) => assert_eq!(phase, LoadPhase::Materializing),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_emit_survives_dropped_receiver() {
        let (sender, receiver) = LoadEventSender::new(ProgressChannelConfig::default());
        drop(receiver);

        sender
            .emit(LoadEvent::PhaseChanged(LoadPhase::Done))
            .await;
        assert!(sender.is_channel_closed());
        assert_eq!(sender.dropped_events_count(), 1);
    }
}
