//! Receiver half of the progress channel.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::Stream;

use super::LoadEvent;

/// Receives load events from a running pipeline.
///
/// Besides the explicit `receive_event`/`try_receive_event` methods it
/// implements [`futures::Stream`], so observers can consume events with
/// `StreamExt` combinators.
pub struct LoadEventReceiver {
    receiver: async_channel::Receiver<LoadEvent>,
    received_events_count: Arc<Mutex<u64>>,
}

impl LoadEventReceiver {
    pub(crate) fn new(receiver: async_channel::Receiver<LoadEvent>) -> Self {
        Self {
            receiver,
            received_events_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Receive the next event, waiting until one is available or every
    /// sender is gone.
    pub async fn receive_event(&self) -> Result<LoadEvent, async_channel::RecvError> {
        match self.receiver.recv().await {
            Ok(event) => {
                self.count_received();
                Ok(event)
            }
            Err(error) => Err(error),
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_receive_event(&self) -> Result<LoadEvent, async_channel::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => {
                self.count_received();
                Ok(event)
            }
            Err(error) => Err(error),
        }
    }

    /// Drain everything currently buffered without waiting.
    pub fn drain(&self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.try_receive_event() {
            events.push(event);
        }
        events
    }

    /// Total events received through this receiver.
    pub fn received_events_count(&self) -> u64 {
        self.received_events_count
            .lock()
            .map(|count| *count)
            .unwrap_or(0)
    }

    fn count_received(&self) {
        if let Ok(mut count) = self.received_events_count.lock() {
            *count += 1;
        }
    }
}

impl Stream for LoadEventReceiver {
    type Item = LoadEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll_next(cx) {
            Poll::Ready(Some(event)) => {
                this.count_received();
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{LoadEventSender, LoadPhase, ProgressChannelConfig};
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_yields_events_in_order() {
        let (sender, mut receiver) = LoadEventSender::new(ProgressChannelConfig::default());
        for phase in [LoadPhase::ResolvingCatalog, LoadPhase::Materializing] {
            sender.send_event(LoadEvent::PhaseChanged(phase)).await.unwrap();
        }
        drop(sender);

        let mut phases = Vec::new();
        while let Some(event) = receiver.next().await {
            if let LoadEvent::PhaseChanged(phase) = event {
                phases.push(phase);
            }
        }
        assert_eq!(
            phases,
            vec![LoadPhase::ResolvingCatalog, LoadPhase::Materializing]
        );
        assert_eq!(receiver.received_events_count(), 2);
    }
}
