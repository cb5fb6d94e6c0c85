use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::stream::{EventStream, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapState {
    Active,
    Completed,
    Errored,
    Cancelled,
}

/// An event stream that applies an async `transform` to every item of `source`.
///
/// Nothing is buffered or prefetched: the source is pulled only when the consumer pulls, and the
/// transform of one item finishes before the next pull can start. Items keep the source order.
///
/// Once the source completes, any pull fails, or the stream is closed/thrown into, the mapped
/// stream is terminal and every later `next()` returns `Step::Done` without touching the source.
pub struct MappedEventStream<S, F> {
    source: S,
    transform: F,
    state: MapState,
}

pub fn map_event_stream<S, F, Fut, R>(source: S, transform: F) -> MappedEventStream<S, F>
where
    S: EventStream,
    F: FnMut(S::Item) -> Fut + Send,
    Fut: Future<Output = Result<R, S::Error>> + Send + 'static,
    R: Send + 'static,
{
    MappedEventStream {
        source,
        transform,
        state: MapState::Active,
    }
}

impl<S, F> MappedEventStream<S, F> {
    pub fn is_terminal(&self) -> bool {
        self.state != MapState::Active
    }
}

#[async_trait]
impl<S, F, Fut, R> EventStream for MappedEventStream<S, F>
where
    S: EventStream,
    F: FnMut(S::Item) -> Fut + Send,
    Fut: Future<Output = Result<R, S::Error>> + Send + 'static,
    R: Send + 'static,
{
    type Item = R;
    type Error = S::Error;

    async fn next(&mut self) -> Result<Step<R>, S::Error> {
        if self.state != MapState::Active {
            return Ok(Step::Done);
        }

        let item = match self.source.next().await {
            Ok(Step::Yield(item)) => item,
            Ok(Step::Done) => {
                debug!("source event stream completed");
                self.state = MapState::Completed;
                return Ok(Step::Done);
            }
            Err(error) => {
                trace!("source event stream rejected a pull");
                self.state = MapState::Errored;
                return Err(error);
            }
        };

        match (self.transform)(item).await {
            Ok(mapped) => Ok(Step::Yield(mapped)),
            Err(error) => {
                trace!("event transform rejected, releasing the source");
                self.state = MapState::Errored;
                if self.source.close().await.is_err() {
                    debug!("source event stream failed to close after a transform rejection");
                }
                Err(error)
            }
        }
    }

    async fn close(&mut self) -> Result<(), S::Error> {
        if self.state != MapState::Active {
            return Ok(());
        }

        debug!("event stream closed by its consumer");
        self.state = MapState::Cancelled;
        self.source.close().await
    }

    async fn throw(&mut self, error: S::Error) -> Result<(), S::Error> {
        if self.state != MapState::Active {
            return Err(error);
        }

        debug!("event stream aborted by its consumer");
        self.state = MapState::Cancelled;
        self.source.throw(error).await
    }
}
