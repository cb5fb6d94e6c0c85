use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::stream::{EventExecutionError, EventStream, Step, StreamClosed};

/// Producer half of a channel-backed event source.
#[derive(Debug)]
pub struct EventSender<T> {
    tx: mpsc::Sender<Result<T, EventExecutionError>>,
}

// Manual impl, deriving would require `T: Clone`.
impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        EventSender {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSender<T> {
    /// Waits for capacity, then publishes `event`.
    pub async fn send(&self, event: T) -> Result<(), StreamClosed> {
        self.tx.send(Ok(event)).await.map_err(|_| StreamClosed)
    }

    /// Makes the consumer's pending (or next) pull reject with `error`.
    pub async fn fail(&self, error: EventExecutionError) -> Result<(), StreamClosed> {
        self.tx.send(Err(error)).await.map_err(|_| StreamClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer closed or dropped the stream.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Consumer half of a channel-backed event source.
///
/// Completes when every sender is dropped. Closing it makes every pending and future `send` fail,
/// which lets producers stop their timers, connections, or broker subscriptions.
#[derive(Debug)]
pub struct ChannelEventStream<T> {
    rx: mpsc::Receiver<Result<T, EventExecutionError>>,
    closed: bool,
}

/// Bounded channel source. A full buffer suspends producers until the consumer pulls again.
pub fn channel<T>(capacity: usize) -> (EventSender<T>, ChannelEventStream<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender { tx }, ChannelEventStream { rx, closed: false })
}

#[async_trait]
impl<T: Send> EventStream for ChannelEventStream<T> {
    type Item = T;
    type Error = EventExecutionError;

    async fn next(&mut self) -> Result<Step<T>, EventExecutionError> {
        if self.closed {
            return Ok(Step::Done);
        }

        match self.rx.recv().await {
            Some(Ok(event)) => Ok(Step::Yield(event)),
            Some(Err(error)) => Err(error),
            None => Ok(Step::Done),
        }
    }

    async fn close(&mut self) -> Result<(), EventExecutionError> {
        self.closed = true;
        self.rx.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_events_then_completes_when_senders_drop() {
        let (sender, mut events) = channel(4);

        sender.send("a").await.expect("receiver is open");
        sender.send("b").await.expect("receiver is open");
        drop(sender);

        assert_eq!(events.next().await, Ok(Step::Yield("a")));
        assert_eq!(events.next().await, Ok(Step::Yield("b")));
        assert_eq!(events.next().await, Ok(Step::Done));
    }

    #[tokio::test]
    async fn failures_reject_the_pull() {
        let (sender, mut events) = channel::<u8>(1);

        sender
            .fail(EventExecutionError::Source("timeout".to_string()))
            .await
            .expect("receiver is open");

        assert_eq!(
            events.next().await,
            Err(EventExecutionError::Source("timeout".to_string()))
        );
    }

    #[tokio::test]
    async fn close_is_observed_by_producers() {
        let (sender, mut events) = channel::<u8>(1);

        events.close().await.expect("close succeeds");
        sender.closed().await;

        assert!(sender.is_closed());
        assert_eq!(sender.send(1).await, Err(StreamClosed));
        assert_eq!(events.next().await, Ok(Step::Done));
    }

    #[tokio::test]
    async fn bounded_buffer_applies_backpressure() {
        let (sender, mut events) = channel::<u8>(1);

        sender.send(1).await.expect("first event fits the buffer");
        let producer = tokio::spawn({
            let sender = sender.clone();
            async move { sender.send(2).await }
        });
        tokio::task::yield_now().await;
        assert!(!producer.is_finished());

        assert_eq!(events.next().await, Ok(Step::Yield(1)));
        producer
            .await
            .expect("producer task completes")
            .expect("receiver is open");
        assert_eq!(events.next().await, Ok(Step::Yield(2)));
    }
}
