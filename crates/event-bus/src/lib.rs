use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tracing::trace;

use flowrunner_core_types::CoreError;

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), CoreError>;
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// Bounded in-memory bus.
///
/// Publishing never waits on subscribers: a slow subscriber lags and loses the
/// oldest events instead of stalling the publisher, and publishing with no
/// subscribers at all is a no-op.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), CoreError> {
        if self.sender.receiver_count() == 0 {
            trace!("no subscribers, dropping event");
            return Ok(());
        }
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|err| CoreError::new(err.to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

/// Helper to materialise an mpsc receiver from the bus subscription
/// so callers can await events without handling broadcast semantics directly.
pub fn to_mpsc<E>(bus: Arc<InMemoryBus<E>>, capacity: usize) -> mpsc::Receiver<E>
where
    E: Event,
{
    let mut rx = bus.subscribe();
    let (tx, out_rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    if tx.send(ev).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(skipped, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    out_rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let bus = InMemoryBus::<u32>::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.publish(1).await.is_ok());
    }

    #[tokio::test]
    async fn every_subscriber_receives_events() {
        let bus = InMemoryBus::<u32>::new(4);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(7).await.unwrap();
        assert_eq!(a.recv().await.unwrap(), 7);
        assert_eq!(b.recv().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn slow_subscriber_does_not_block_publisher() {
        let bus = InMemoryBus::<u32>::new(2);
        let mut rx = bus.subscribe();
        for i in 0..10 {
            bus.publish(i).await.unwrap();
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert_eq!(rx.recv().await.unwrap(), 8);
    }

    #[tokio::test]
    async fn mpsc_bridge_forwards_events() {
        let bus = InMemoryBus::<u32>::new(4);
        let mut rx = to_mpsc(bus.clone(), 4);
        bus.publish(3).await.unwrap();
        assert_eq!(rx.recv().await, Some(3));
    }
}
