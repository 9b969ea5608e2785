//! Line framing for streamed response bodies.
//!
//! Anthropic streams server-sent events and Ollama streams NDJSON; both are
//! line oriented, so each service only supplies a parser for a single line.

use std::time::Duration;

use futures::{
    Stream,
    future,
    stream::{self, BoxStream, StreamExt},
};

use crate::chat::ChatStream;
use crate::error_handler::{AiLlmError, Result};

/// Splits a byte stream into `\n`-terminated lines without the line ending.
///
/// A trailing line without a newline is still emitted. The stream ends after
/// the first transport error.
pub(crate) fn lines<S, B>(body: S) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = (Box::pin(body), Vec::<u8>::new(), false);
    stream::unfold(state, |(mut body, mut buf, mut done)| async move {
        loop {
            if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let rest = buf.split_off(pos + 1);
                let line = std::mem::replace(&mut buf, rest);
                return Some((decode_line(&line), (body, buf, done)));
            }
            if done {
                if buf.is_empty() {
                    return None;
                }
                let line = std::mem::take(&mut buf);
                return Some((decode_line(&line), (body, buf, done)));
            }
            match body.next().await {
                Some(Ok(chunk)) => buf.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    buf.clear();
                    return Some((Err(e), (body, buf, true)));
                }
                None => done = true,
            }
        }
    })
    .boxed()
}

fn decode_line(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(|line| line.trim_end_matches(['\n', '\r']).to_owned())
        .map_err(|e| AiLlmError::Decode(format!("stream line is not UTF-8: {e}")))
}

/// Lines of a streamed HTTP response.
pub(crate) fn response_lines(resp: reqwest::Response, timeout: Duration) -> BoxStream<'static, Result<String>> {
    lines(
        resp.bytes_stream()
            .map(move |chunk| chunk.map_err(|e| AiLlmError::from_transport(e, timeout))),
    )
}

/// Keeps the text a provider-specific `parse` finds on each line.
///
/// `parse` returns `None` for lines that carry no text (keep-alives, metadata).
pub(crate) fn text_stream<F>(lines: BoxStream<'static, Result<String>>, parse: F) -> ChatStream
where
    F: Fn(&str) -> Option<Result<String>> + Send + 'static,
{
    lines
        .filter_map(move |line| {
            future::ready(match line {
                Ok(line) => parse(&line),
                Err(e) => Some(Err(e)),
            })
        })
        .boxed()
}
