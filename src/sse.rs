//! SSE frame decoding shared by the chat and export flows.

use crate::protocol::{DONE_MARKER, StreamEvent};
use futures::{Stream, StreamExt};
use std::ops::ControlFlow;

/// How a stream read finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The `[DONE]` terminator arrived or the connection closed.
    Done,
    /// The handler broke out early; the rest of the stream is abandoned.
    Stopped,
}

/// Reads an SSE byte stream and invokes `on_event` for each parsed
/// `data: <json>` line, in arrival order.
///
/// Partial lines are buffered across chunks. Lines that fail to parse as
/// JSON are dropped without aborting the stream. The handler may return
/// `ControlFlow::Break(())` to stop reading early, in which case the
/// result is [`StreamEnd::Stopped`].
pub async fn read_sse_stream<S, B, E, F>(mut stream: S, mut on_event: F) -> Result<StreamEnd, E>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    F: FnMut(StreamEvent) -> ControlFlow<()>,
{
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.push_str(&String::from_utf8_lossy(chunk.as_ref()));

        // Consume complete lines; the trailing partial stays buffered.
        while let Some(newline) = buffer.find('\n') {
            let line: String = buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data == DONE_MARKER {
                return Ok(StreamEnd::Done);
            }
            let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
                continue;
            };
            if on_event(event).is_break() {
                return Ok(StreamEnd::Stopped);
            }
        }
    }

    Ok(StreamEnd::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::convert::Infallible;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, Infallible>> + Unpin {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(p.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(parts: &[&str]) -> (Vec<StreamEvent>, StreamEnd) {
        let mut events = Vec::new();
        let end = read_sse_stream(chunks(parts), |event| {
            events.push(event);
            ControlFlow::Continue(())
        })
        .await
        .unwrap();
        (events, end)
    }

    #[tokio::test]
    async fn parses_events_in_order() {
        let (events, end) = collect(&[
            "data: {\"type\":\"text\",\"content\":\"Hi\"}\n",
            "data: {\"type\":\"text\",\"content\":\" there\"}\ndata: [DONE]\n",
        ])
        .await;

        assert_eq!(end, StreamEnd::Done);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].value(), Some("Hi"));
        assert_eq!(events[1].value(), Some(" there"));
    }

    #[tokio::test]
    async fn buffers_lines_split_across_chunks() {
        let (events, _) = collect(&[
            "data: {\"type\":\"te",
            "xt\",\"content\":\"split\"}\n",
            "data: [DONE]\n",
        ])
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value(), Some("split"));
    }

    #[tokio::test]
    async fn malformed_lines_are_dropped_silently() {
        let (events, end) = collect(&[
            "data: {not json}\n",
            "data: {\"type\":\"text\",\"content\":\"still here\"}\n",
        ])
        .await;

        assert_eq!(end, StreamEnd::Done);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value(), Some("still here"));
    }

    #[tokio::test]
    async fn non_data_lines_are_ignored() {
        let (events, _) = collect(&[
            ": keep-alive\nevent: message\ndata: {\"type\":\"text\",\"content\":\"x\"}\n",
        ])
        .await;

        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn done_marker_is_not_parsed_as_json() {
        let (events, end) = collect(&["data: [DONE]\ndata: {\"type\":\"text\",\"content\":\"late\"}\n"]).await;

        assert_eq!(end, StreamEnd::Done);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn handler_can_stop_early() {
        let mut seen = 0;
        let end = read_sse_stream(
            chunks(&[
                "data: {\"type\":\"pdf\",\"data\":\"QUJD\"}\n",
                "data: {\"type\":\"text\",\"content\":\"never read\"}\n",
            ]),
            |_| {
                seen += 1;
                ControlFlow::Break(())
            },
        )
        .await
        .unwrap();

        assert_eq!(end, StreamEnd::Stopped);
        assert_eq!(seen, 1);
    }

    #[tokio::test]
    async fn natural_close_counts_as_done() {
        let (events, end) = collect(&["data: {\"type\":\"text\",\"content\":\"tail\"}\n"]).await;

        assert_eq!(end, StreamEnd::Done);
        assert_eq!(events.len(), 1);
    }
}
