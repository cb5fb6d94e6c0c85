//! The asynchronous iteration protocol shared by event sources and mapped response streams.
//!
//! An [`EventStream`] is a single-consumer, pull-based sequence. `next()` takes `&mut self`, so a
//! second pull cannot be issued while one is outstanding, and nothing is produced until the
//! consumer asks for it. Cancellation is explicit through [`EventStream::close`] and
//! [`EventStream::throw`]; dropping a stream releases its resources as well.

mod channel;
mod error;
mod map;

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde_json::Value;

use crate::response::execution_result::ExecutionResult;

pub use channel::{channel, ChannelEventStream, EventSender};
pub use error::{EventExecutionError, StreamClosed};
pub use map::{map_event_stream, MappedEventStream};

/// Outcome of a successful pull.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    Yield(T),
    Done,
}

impl<T> Step<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Step::Yield(value) => Some(value),
            Step::Done => None,
        }
    }
}

/// A single-consumer, pull-based sequence of items.
///
/// At most one call is outstanding at a time, which `&mut self` enforces. The consumer pulls
/// sequentially and the stream produces nothing ahead of a pull. After `close` or `throw`, `next`
/// should return `Step::Done`.
#[async_trait]
pub trait EventStream: Send {
    type Item: Send;
    type Error: Send;

    /// Pulls the next item. `Ok(Step::Done)` means the stream is exhausted.
    async fn next(&mut self) -> Result<Step<Self::Item>, Self::Error>;

    /// Cancels the stream and releases whatever it holds.
    ///
    /// Streams without cancellation support keep the default, which does nothing and succeeds.
    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Aborts the stream with `error`.
    ///
    /// The default closes the stream and rejects with `error`, whatever the close outcome.
    async fn throw(&mut self, error: Self::Error) -> Result<(), Self::Error> {
        let _ = self.close().await;
        Err(error)
    }
}

#[async_trait]
impl<S: EventStream + ?Sized> EventStream for Box<S> {
    type Item = S::Item;
    type Error = S::Error;

    async fn next(&mut self) -> Result<Step<Self::Item>, Self::Error> {
        (**self).next().await
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        (**self).close().await
    }

    async fn throw(&mut self, error: Self::Error) -> Result<(), Self::Error> {
        (**self).throw(error).await
    }
}

/// Raw event payloads produced by a subscribe resolver.
pub type SourceEventStream = Box<dyn EventStream<Item = Value, Error = EventExecutionError>>;

/// One execution result per source event.
pub type ResponseStream =
    Box<dyn EventStream<Item = ExecutionResult, Error = EventExecutionError>>;

/// Something that can open a fresh event source, the way an async-iterable hands out iterators.
pub trait EventSourceFactory: Send + Sync {
    fn open(&self) -> SourceEventStream;
}

impl<F> EventSourceFactory for F
where
    F: Fn() -> SourceEventStream + Send + Sync,
{
    fn open(&self) -> SourceEventStream {
        self()
    }
}

/// Finite in-memory event stream.
pub struct IterEventStream<I> {
    items: Option<I>,
}

pub fn iter<I>(items: I) -> IterEventStream<I::IntoIter>
where
    I: IntoIterator,
    I::IntoIter: Send,
    I::Item: Send,
{
    IterEventStream {
        items: Some(items.into_iter()),
    }
}

#[async_trait]
impl<I> EventStream for IterEventStream<I>
where
    I: Iterator + Send,
    I::Item: Send,
{
    type Item = I::Item;
    type Error = EventExecutionError;

    async fn next(&mut self) -> Result<Step<Self::Item>, Self::Error> {
        match self.items.as_mut().and_then(Iterator::next) {
            Some(item) => Ok(Step::Yield(item)),
            None => {
                self.items = None;
                Ok(Step::Done)
            }
        }
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.items = None;
        Ok(())
    }
}

/// Event stream over a `futures::Stream` of results. Closing drops the inner stream.
pub struct StreamEventStream<S> {
    inner: Option<S>,
}

pub fn from_stream<S, T, E>(stream: S) -> StreamEventStream<S>
where
    S: Stream<Item = Result<T, E>> + Send + Unpin,
{
    StreamEventStream {
        inner: Some(stream),
    }
}

#[async_trait]
impl<S, T, E> EventStream for StreamEventStream<S>
where
    S: Stream<Item = Result<T, E>> + Send + Unpin,
    T: Send,
    E: Send,
{
    type Item = T;
    type Error = E;

    async fn next(&mut self) -> Result<Step<T>, E> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(Step::Done);
        };

        match inner.next().await {
            Some(Ok(item)) => Ok(Step::Yield(item)),
            Some(Err(error)) => Err(error),
            None => {
                self.inner = None;
                Ok(Step::Done)
            }
        }
    }

    async fn close(&mut self) -> Result<(), E> {
        self.inner = None;
        Ok(())
    }
}

/// Exposes an event stream as a `futures::Stream`, for hosts that speak streams.
///
/// The stream ends after the first error. Dropping it drops the event stream.
pub fn into_stream<S>(mut events: S) -> BoxStream<'static, Result<S::Item, S::Error>>
where
    S: EventStream + 'static,
    S::Item: 'static,
    S::Error: 'static,
{
    let stream = async_stream::stream! {
        loop {
            match events.next().await {
                Ok(Step::Yield(item)) => yield Ok(item),
                Ok(Step::Done) => break,
                Err(error) => {
                    yield Err(error);
                    break;
                }
            }
        }
    };

    stream.boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;

    #[tokio::test]
    async fn iter_stream_yields_then_completes() {
        let mut events = iter(vec![json!(1), json!(2)]);

        assert_eq!(events.next().await, Ok(Step::Yield(json!(1))));
        assert_eq!(events.next().await, Ok(Step::Yield(json!(2))));
        assert_eq!(events.next().await, Ok(Step::Done));
        assert_eq!(events.next().await, Ok(Step::Done));
    }

    #[tokio::test]
    async fn iter_stream_stops_after_close() {
        let mut events = iter(vec![1, 2, 3]);

        assert_eq!(events.next().await, Ok(Step::Yield(1)));
        assert_eq!(events.close().await, Ok(()));
        assert_eq!(events.next().await, Ok(Step::Done));
    }

    #[tokio::test]
    async fn default_throw_closes_and_rejects() {
        let mut events = iter(vec![1, 2]);

        let result = events
            .throw(EventExecutionError::Aborted("client left".to_string()))
            .await;

        assert_eq!(
            result,
            Err(EventExecutionError::Aborted("client left".to_string()))
        );
        assert_eq!(events.next().await, Ok(Step::Done));
    }

    #[tokio::test]
    async fn from_stream_surfaces_errors_and_completion() {
        let inner = stream::iter(vec![
            Ok(json!("a")),
            Err(EventExecutionError::Source("broker down".to_string())),
        ]);
        let mut events = from_stream(inner);

        assert_eq!(events.next().await, Ok(Step::Yield(json!("a"))));
        assert_eq!(
            events.next().await,
            Err(EventExecutionError::Source("broker down".to_string()))
        );
        assert_eq!(events.next().await, Ok(Step::Done));
    }

    #[tokio::test]
    async fn boxed_streams_delegate() {
        let mut events: SourceEventStream = Box::new(iter(vec![json!(true)]));

        assert_eq!(events.next().await, Ok(Step::Yield(json!(true))));
        assert_eq!(events.next().await, Ok(Step::Done));
    }

    #[tokio::test]
    async fn into_stream_ends_after_first_error() {
        let inner = stream::iter(vec![
            Ok(1),
            Err(EventExecutionError::Source("x".to_string())),
            Ok(2),
        ]);
        let collected: Vec<_> = into_stream(from_stream(inner)).collect().await;

        assert_eq!(
            collected,
            vec![Ok(1), Err(EventExecutionError::Source("x".to_string()))]
        );
    }

    #[test]
    fn closures_are_event_source_factories() {
        let factory = || -> SourceEventStream { Box::new(iter(vec![json!(1)])) };
        let _opened: SourceEventStream = factory.open();
    }
}
