// Server-sent events framing for streamed completions.
// Lines come from a length-capped codec; events end at a blank line.

use std::io;

use bytes::Buf;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

use crate::llm_client::LlmError;

/// Longest line accepted from the backend before the stream is abandoned.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Groups SSE lines into events, yielding the joined `data` payload of each.
#[derive(Debug, Default)]
pub struct EventAssembler {
    data: Vec<String>,
}

impl EventAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line, terminator already stripped. Returns a payload when the line closes an event.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.flush();
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        // comments, event:, id: and retry: carry nothing we use
        None
    }

    /// Payload of an event left open, e.g. when the body ends without a blank line.
    pub fn flush(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

type Lines<B> = FramedRead<StreamReader<BoxStream<'static, io::Result<B>>, B>, LinesCodec>;

struct SseState<B, F> {
    lines: Lines<B>,
    events: EventAssembler,
    parse: F,
    max_line: usize,
    done: bool,
}

fn line_error(e: LinesCodecError, max_line: usize) -> LlmError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            LlmError::MalformedResponse(format!("stream line exceeds {} bytes", max_line))
        }
        LinesCodecError::Io(e) => LlmError::Interrupted(e.to_string()),
    }
}

/// Turn a byte stream of SSE frames into parsed items, one per event.
///
/// The first error ends the stream.
pub fn sse_events<S, B, E, T, F>(body: S, parse: F) -> BoxStream<'static, Result<T, LlmError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: Buf + Unpin + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    T: Send + 'static,
    F: Fn(&str) -> Result<T, LlmError> + Send + 'static,
{
    sse_events_with_limit(body, MAX_LINE_BYTES, parse)
}

pub fn sse_events_with_limit<S, B, E, T, F>(
    body: S,
    max_line: usize,
    parse: F,
) -> BoxStream<'static, Result<T, LlmError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: Buf + Unpin + Send + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    T: Send + 'static,
    F: Fn(&str) -> Result<T, LlmError> + Send + 'static,
{
    let body = body.map(|chunk| chunk.map_err(io::Error::other)).boxed();
    let state = SseState {
        lines: FramedRead::new(
            StreamReader::new(body),
            LinesCodec::new_with_max_length(max_line),
        ),
        events: EventAssembler::new(),
        parse,
        max_line,
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        while !st.done {
            let payload = match st.lines.next().await {
                Some(Ok(line)) => st.events.push_line(&line),
                Some(Err(e)) => {
                    st.done = true;
                    let err = line_error(e, st.max_line);
                    return Some((Err(err), st));
                }
                None => {
                    st.done = true;
                    st.events.flush()
                }
            };
            if let Some(data) = payload {
                let item = (st.parse)(&data);
                if item.is_err() {
                    st.done = true;
                }
                return Some((item, st));
            }
        }
        None
    })
    .boxed()
}
