//! Incremental decoding of `text/event-stream` response bodies.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::{Stream, StreamExt};
use memchr::memmem;
use tracing::warn;

use crate::Error;

/// Largest amount of undelimited data held while waiting for a record separator.
const MAX_BUFFERED_BYTES: usize = 1_000_000;

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// All `data:` lines joined with `\n`.
    pub data: String,
}

impl SseEvent {
    /// Parse one record (the text between two blank-line separators).
    ///
    /// Records without any `data:` line carry nothing and are dropped.
    /// Fields other than `data` are ignored.
    pub fn parse(record: &str) -> Option<Self> {
        let mut data_lines = Vec::new();

        for line in record.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            if field == "data" {
                data_lines.push(value.strip_prefix(' ').unwrap_or(value));
            }
        }

        if data_lines.is_empty() {
            return None;
        }

        Some(Self {
            data: data_lines.join("\n"),
        })
    }
}

/// Decodes a byte stream into [`SseEvent`]s.
///
/// Bytes are buffered until a full record is available, so records and UTF-8
/// sequences may be split across network chunks. A decoding failure is
/// reported after every record that preceded it, and ends the stream.
pub struct SseStream<S> {
    inner: S,
    buffer: Vec<u8>,
    events: VecDeque<SseEvent>,
    error: Option<Error>,
    finished: bool,
}

impl<S> SseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            events: VecDeque::new(),
            error: None,
            finished: false,
        }
    }

    /// Move every complete record out of the buffer.
    fn drain_records(&mut self) -> Result<(), Error> {
        let finder = memmem::Finder::new(b"\n\n");
        let mut start = 0;

        while let Some(pos) = finder.find(&self.buffer[start..]) {
            let end = start + pos;
            let record = std::str::from_utf8(&self.buffer[start..end])
                .map_err(|e| Error::streaming(format!("Invalid UTF-8 in SSE event: {e}")))?;
            if let Some(event) = SseEvent::parse(record) {
                self.events.push_back(event);
            }
            start = end + 2;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        Ok(())
    }

    fn push_bytes(&mut self, chunk: &[u8]) {
        // Normalise CRLF so the separator search only has one form to find.
        for &byte in chunk {
            match self.buffer.last_mut() {
                Some(last) if byte == b'\n' && *last == b'\r' => *last = b'\n',
                _ => self.buffer.push(byte),
            }
        }
    }

    /// Stop reading; `error` is yielded once the queued records are out.
    fn fail(&mut self, error: Error) {
        self.error = Some(error);
        self.finished = true;
    }
}

impl<S, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = Result<SseEvent, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if let Some(e) = self.error.take() {
                return Poll::Ready(Some(Err(e)));
            }
            if self.finished {
                return Poll::Ready(None);
            }

            match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => {
                    self.push_bytes(&chunk);
                    if let Err(e) = self.drain_records() {
                        self.fail(e);
                        continue;
                    }
                    // Only the trailing partial record is left at this point.
                    if self.buffer.len() > MAX_BUFFERED_BYTES {
                        warn!(buffered = self.buffer.len(), "SSE record exceeded buffer limit");
                        self.buffer.clear();
                        self.fail(Error::streaming("SSE buffer exceeded maximum size"));
                    }
                }
                Some(Err(e)) => {
                    self.fail(Error::streaming(format!("Stream error: {e}")));
                }
                None => {
                    self.finished = true;
                    // A final record may arrive without its trailing blank line.
                    let rest = std::mem::take(&mut self.buffer);
                    match std::str::from_utf8(&rest) {
                        Ok(text) => {
                            if let Some(event) = SseEvent::parse(text.trim()) {
                                self.events.push_back(event);
                            }
                        }
                        Err(e) => {
                            self.fail(Error::streaming(format!("Invalid UTF-8 in SSE event: {e}")));
                        }
                    }
                }
            }
        }
    }
}

/// Extension trait to add SSE decoding to byte streams.
pub trait SseStreamExt: Stream {
    fn sse_events(self) -> SseStream<Self>
    where
        Self: Sized,
    {
        SseStream::new(self)
    }
}

impl<S: Stream> SseStreamExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn byte_stream(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = Result<bytes::Bytes, std::io::Error>> + Unpin {
        stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(bytes::Bytes::from_static(c)))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_parse_record() {
        let event = SseEvent::parse("event: message\ndata: first\ndata: second\nid: 7").unwrap();
        assert_eq!(event.data, "first\nsecond");

        assert!(SseEvent::parse(": keep-alive").is_none());
        assert_eq!(SseEvent::parse("data:no-space").unwrap().data, "no-space");
    }

    #[tokio::test]
    async fn test_complete_events() {
        let mut events = byte_stream(vec![b"data: Hello\n\ndata: World\n\n"]).sse_events();

        assert_eq!(events.next().await.unwrap().unwrap().data, "Hello");
        assert_eq!(events.next().await.unwrap().unwrap().data, "World");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_events_split_across_chunks() {
        let mut events =
            byte_stream(vec![b"data: Hel", b"lo World\n", b"\ndata: ", b"Second\n\n"]).sse_events();

        assert_eq!(events.next().await.unwrap().unwrap().data, "Hello World");
        assert_eq!(events.next().await.unwrap().unwrap().data, "Second");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_crlf_separators() {
        let mut events =
            byte_stream(vec![b"data: one\r\n\r", b"\ndata: two\r\n\r\n"]).sse_events();

        assert_eq!(events.next().await.unwrap().unwrap().data, "one");
        assert_eq!(events.next().await.unwrap().unwrap().data, "two");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_utf8_split_across_chunks() {
        // "€" is E2 82 AC.
        let mut events = byte_stream(vec![b"data: Price: \xE2\x82", b"\xAC100\n\n"]).sse_events();

        assert_eq!(events.next().await.unwrap().unwrap().data, "Price: €100");
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_an_error() {
        let mut events = byte_stream(vec![b"data: bad \xFF\xFE bytes\n\n"]).sse_events();

        assert!(events.next().await.unwrap().is_err());
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_records_before_invalid_utf8_come_first() {
        let mut events =
            byte_stream(vec![b"data: good\n\ndata: bad \xFF\n\ndata: after\n\n"]).sse_events();

        assert_eq!(events.next().await.unwrap().unwrap().data, "good");
        assert!(events.next().await.unwrap().is_err());
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_large_chunk_of_complete_records() {
        let record = format!("data: {}\n\n", "x".repeat(50));
        let body = record.repeat(20_000);
        assert!(body.len() > MAX_BUFFERED_BYTES);

        let chunks = vec![Ok::<_, std::io::Error>(bytes::Bytes::from(body))];
        let events: Vec<_> = stream::iter(chunks).sse_events().collect().await;

        assert_eq!(events.len(), 20_000);
        assert!(events.iter().all(|e| e.as_ref().is_ok_and(|e| e.data.len() == 50)));
    }

    #[tokio::test]
    async fn test_oversized_partial_record_is_an_error() {
        let mut body = b"data: ok\n\ndata: ".to_vec();
        body.extend(std::iter::repeat(b'x').take(MAX_BUFFERED_BYTES + 1));

        let chunks = vec![Ok::<_, std::io::Error>(bytes::Bytes::from(body))];
        let mut events = stream::iter(chunks).sse_events();

        assert_eq!(events.next().await.unwrap().unwrap().data, "ok");
        assert!(events.next().await.unwrap().is_err());
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_final_record_without_separator() {
        let mut events = byte_stream(vec![b"data: first\n\n", b"data: last"]).sse_events();

        assert_eq!(events.next().await.unwrap().unwrap().data, "first");
        assert_eq!(events.next().await.unwrap().unwrap().data, "last");
        assert!(events.next().await.is_none());
    }
}
