//! Result streams for `StreamExecute`.
//!
//! A stream is a tagged sequence: zero or more `Fragment`s followed by
//! exactly one terminal event, `Done` or `Error`. The first fragment carries
//! the fields, later fragments carry rows. Errors found after streaming began
//! arrive as the terminal `Error`, never as a fragment.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::queryservice::QueryServiceError;
use crate::types::QueryResult;

/// One element of a result stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A piece of the result: fields only, or rows only.
    Fragment(QueryResult),
    /// The stream completed successfully.
    Done,
    /// The stream failed after it started.
    Error(QueryServiceError),
}

impl StreamEvent {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// A lazily produced result stream.
///
/// Yields nothing after its terminal event. An underlying stream that ends
/// without a terminal event yields `Error(StreamTruncated)`. Dropping the
/// stream cancels it.
pub struct QueryStream {
    inner: BoxStream<'static, StreamEvent>,
    finished: bool,
}

impl QueryStream {
    pub fn new(inner: impl Stream<Item = StreamEvent> + Send + 'static) -> Self {
        Self {
            inner: inner.boxed(),
            finished: false,
        }
    }

    /// A stream that yields `fragments` in order, then `Done`.
    #[must_use]
    pub fn from_fragments(fragments: Vec<QueryResult>) -> Self {
        let events = fragments
            .into_iter()
            .map(StreamEvent::Fragment)
            .chain(std::iter::once(StreamEvent::Done));
        Self::new(stream::iter(events))
    }

    /// Drain the stream, returning every fragment or the terminal error.
    pub async fn try_collect_fragments(mut self) -> Result<Vec<QueryResult>, QueryServiceError> {
        let mut fragments = Vec::new();
        while let Some(event) = self.next().await {
            match event {
                StreamEvent::Fragment(fragment) => fragments.push(fragment),
                StreamEvent::Done => return Ok(fragments),
                StreamEvent::Error(e) => return Err(e),
            }
        }
        Err(QueryServiceError::StreamTruncated)
    }
}

impl Stream for QueryStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let event = match self.inner.poll_next_unpin(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Some(event)) => event,
            Poll::Ready(None) => StreamEvent::Error(QueryServiceError::StreamTruncated),
        };
        if event.is_terminal() {
            self.finished = true;
        }
        Poll::Ready(Some(event))
    }
}

impl std::fmt::Debug for QueryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStream")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Value};

    fn header() -> QueryResult {
        QueryResult {
            fields: vec![Field::new("a", 1)],
            ..QueryResult::default()
        }
    }

    fn rows() -> QueryResult {
        QueryResult::rows_fragment(vec![vec![Value::Int(1)]])
    }

    #[tokio::test]
    async fn test_from_fragments_ends_with_done() {
        let mut stream = QueryStream::from_fragments(vec![header(), rows()]);
        assert_eq!(stream.next().await, Some(StreamEvent::Fragment(header())));
        assert_eq!(stream.next().await, Some(StreamEvent::Fragment(rows())));
        assert_eq!(stream.next().await, Some(StreamEvent::Done));
        assert_eq!(stream.next().await, None);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_nothing_after_terminal_error() {
        let events = vec![
            StreamEvent::Fragment(header()),
            StreamEvent::Error(QueryServiceError::LockPoisoned),
            StreamEvent::Fragment(rows()),
            StreamEvent::Done,
        ];
        let mut stream = QueryStream::new(stream::iter(events));
        assert_eq!(stream.next().await, Some(StreamEvent::Fragment(header())));
        assert_eq!(
            stream.next().await,
            Some(StreamEvent::Error(QueryServiceError::LockPoisoned))
        );
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_missing_terminal_event_is_truncation() {
        let mut stream = QueryStream::new(stream::iter(vec![StreamEvent::Fragment(header())]));
        assert_eq!(stream.next().await, Some(StreamEvent::Fragment(header())));
        assert_eq!(
            stream.next().await,
            Some(StreamEvent::Error(QueryServiceError::StreamTruncated))
        );
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_try_collect_fragments() {
        let fragments = QueryStream::from_fragments(vec![header(), rows()])
            .try_collect_fragments()
            .await
            .unwrap();
        assert_eq!(fragments, vec![header(), rows()]);

        let failed = QueryStream::new(stream::iter(vec![
            StreamEvent::Fragment(header()),
            StreamEvent::Error(QueryServiceError::StreamTruncated),
        ]))
        .try_collect_fragments()
        .await;
        assert_eq!(failed, Err(QueryServiceError::StreamTruncated));
    }
}
