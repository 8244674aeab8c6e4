//! Streaming decompression pipeline with a hard decompressed-byte ceiling.
//!
//! The raw response body is fed chunk by chunk into a `Write`-based
//! decompression stage (selected from `Content-Encoding`, falling back to
//! `Content-Type` sniffing for compressed containers) which writes into a
//! counting sink. The ceiling is evaluated on the sink's running total, i.e.
//! AFTER decompression, so it bounds decompression-bomb amplification rather
//! than wire size. Once the ceiling trips the stream is poisoned: no further
//! chunks are forwarded and the upstream connection is torn down on drop.

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use flate2::write::{GzDecoder, ZlibDecoder};
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap};
use tokio::time::{Instant, Sleep, sleep_until};

use super::constants::BROTLI_BUFFER_SIZE;
use super::error::FetchError;

/// Decompression stage selected for a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContentCoding {
    Identity,
    Gzip,
    Deflate,
    Brotli,
}

/// Picks the decompression stage for a response.
///
/// `Content-Encoding` wins; with no encoding header, compressed-container
/// content types (`application/gzip`) are sniffed. Anything unrecognized
/// passes through unmodified.
pub(crate) fn select_coding(headers: &HeaderMap) -> ContentCoding {
    if let Some(value) = headers.get(CONTENT_ENCODING).and_then(|v| v.to_str().ok()) {
        return match value.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => ContentCoding::Gzip,
            "deflate" => ContentCoding::Deflate,
            "br" => ContentCoding::Brotli,
            _ => ContentCoding::Identity,
        };
    }
    match content_type_essence(headers).as_deref() {
        Some("application/gzip" | "application/x-gzip") => ContentCoding::Gzip,
        _ => ContentCoding::Identity,
    }
}

/// Returns the lowercased Content-Type without parameters, if present.
pub(crate) fn content_type_essence(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(';')
                .next()
                .unwrap_or(v)
                .trim()
                .to_ascii_lowercase()
        })
        .filter(|v| !v.is_empty())
}

/// Returns the offending content type when a final response cannot carry a
/// feed document, `None` when it is acceptable.
///
/// A missing Content-Type is accepted (plenty of feed servers omit it), as is
/// anything XML-ish, JSON-ish, textual, an octet stream, or a compressed
/// container the pipeline can unwrap.
pub(crate) fn unsupported_media_type(headers: &HeaderMap) -> Option<String> {
    let essence = content_type_essence(headers)?;
    let acceptable = essence.starts_with("text/")
        || essence.ends_with("+xml")
        || essence.ends_with("+json")
        || matches!(
            essence.as_str(),
            "application/xml"
                | "application/json"
                | "application/octet-stream"
                | "application/gzip"
                | "application/x-gzip"
        );
    if acceptable { None } else { Some(essence) }
}

/// Shared state between the decompressor's output sink and the stream that
/// drains it.
#[derive(Debug)]
struct SinkState {
    buf: Vec<u8>,
    total: u64,
    limit: u64,
}

/// `Write` endpoint the decompressors write decompressed bytes into.
///
/// Counts every byte and refuses the write that would push the running total
/// past the ceiling, which propagates out of the decoder as an I/O error.
#[derive(Debug, Clone)]
struct CountingSink(Arc<Mutex<SinkState>>);

impl Write for CountingSink {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        let mut state = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        state.total = state.total.saturating_add(data.len() as u64);
        if state.total > state.limit {
            return Err(std::io::Error::other("decompressed payload ceiling exceeded"));
        }
        state.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

enum Decoder {
    Identity(CountingSink),
    Gzip(GzDecoder<CountingSink>),
    Deflate(ZlibDecoder<CountingSink>),
    Brotli(Box<brotli::DecompressorWriter<CountingSink>>),
}

impl Decoder {
    fn new(coding: ContentCoding, sink: CountingSink) -> Self {
        match coding {
            ContentCoding::Identity => Self::Identity(sink),
            ContentCoding::Gzip => Self::Gzip(GzDecoder::new(sink)),
            ContentCoding::Deflate => Self::Deflate(ZlibDecoder::new(sink)),
            ContentCoding::Brotli => Self::Brotli(Box::new(brotli::DecompressorWriter::new(
                sink,
                BROTLI_BUFFER_SIZE,
            ))),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            Self::Identity(w) => w.write_all(data),
            Self::Gzip(w) => w.write_all(data),
            Self::Deflate(w) => w.write_all(data),
            Self::Brotli(w) => w.write_all(data),
        }
    }

    /// Flushes any buffered tail once the raw stream ends.
    fn finish(&mut self) -> std::io::Result<()> {
        match self {
            Self::Identity(w) => w.flush(),
            Self::Gzip(w) => w.try_finish(),
            Self::Deflate(w) => w.try_finish(),
            Self::Brotli(w) => w.flush(),
        }
    }
}

/// Decompressed, size-bounded response body.
///
/// Yields decompressed chunks until the raw stream ends, the ceiling trips
/// (`payload_too_large`), the walk's total deadline passes (`timeout_total`),
/// or the upstream stream fails (`upstream_error`). Terminal after the first
/// error: further polls yield `None` and the raw connection is dropped.
pub struct BodyStream {
    inner: BoxStream<'static, Result<Bytes, String>>,
    decoder: Decoder,
    state: Arc<Mutex<SinkState>>,
    url: String,
    limit: u64,
    // Owned timer, not an opportunistic Instant check: a stalled upstream
    // returns Pending without waking us, so the deadline must register its
    // own waker to fire the walk out of a hung body read.
    deadline: Pin<Box<Sleep>>,
    done: bool,
    poisoned: bool,
}

impl BodyStream {
    pub(crate) fn new(
        response: reqwest::Response,
        url: String,
        limit: u64,
        deadline: Instant,
    ) -> Self {
        let coding = select_coding(response.headers());
        let inner = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| e.to_string()))
            .boxed();
        Self::from_parts(inner, coding, url, limit, deadline)
    }

    fn from_parts(
        inner: BoxStream<'static, Result<Bytes, String>>,
        coding: ContentCoding,
        url: String,
        limit: u64,
        deadline: Instant,
    ) -> Self {
        let state = Arc::new(Mutex::new(SinkState {
            buf: Vec::new(),
            total: 0,
            limit,
        }));
        let decoder = Decoder::new(coding, CountingSink(Arc::clone(&state)));
        Self {
            inner,
            decoder,
            state,
            url,
            limit,
            deadline: Box::pin(sleep_until(deadline)),
            done: false,
            poisoned: false,
        }
    }

    /// Total decompressed bytes observed so far.
    #[must_use]
    pub fn bytes_seen(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).total
    }

    /// Collects the remaining stream into one buffer.
    ///
    /// # Errors
    ///
    /// Returns the first stream error (`payload_too_large`, `timeout_total`,
    /// or `upstream_error`).
    pub async fn collect_bytes(mut self) -> Result<Bytes, FetchError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(out))
    }

    fn drain(&self) -> Bytes {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Bytes::from(std::mem::take(&mut state.buf))
    }

    fn over_limit(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).total > self.limit
    }

    /// Maps a decoder I/O failure: over the ceiling means the sink refused
    /// the write; anything else is corrupt compressed input.
    fn decode_failure(&mut self, error: &std::io::Error) -> FetchError {
        self.poisoned = true;
        if self.over_limit() {
            FetchError::payload_too_large(&self.url, self.limit)
        } else {
            FetchError::upstream(&self.url, format!("decode failed: {error}"))
        }
    }
}

impl Stream for BodyStream {
    type Item = Result<Bytes, FetchError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.poisoned || this.done {
                return Poll::Ready(None);
            }
            if this.deadline.as_mut().poll(cx).is_ready() {
                this.poisoned = true;
                return Poll::Ready(Some(Err(FetchError::timeout_total(&this.url))));
            }
            match this.inner.poll_next_unpin(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    if let Err(e) = this.decoder.write_all(&chunk) {
                        return Poll::Ready(Some(Err(this.decode_failure(&e))));
                    }
                    let out = this.drain();
                    if out.is_empty() {
                        // Decoder consumed the chunk without emitting output
                        // yet (e.g. mid-header); keep pulling.
                        continue;
                    }
                    return Poll::Ready(Some(Ok(out)));
                }
                Poll::Ready(Some(Err(message))) => {
                    this.poisoned = true;
                    return Poll::Ready(Some(Err(FetchError::upstream(&this.url, message))));
                }
                Poll::Ready(None) => {
                    if let Err(e) = this.decoder.finish() {
                        return Poll::Ready(Some(Err(this.decode_failure(&e))));
                    }
                    this.done = true;
                    let out = this.drain();
                    if out.is_empty() {
                        return Poll::Ready(None);
                    }
                    return Poll::Ready(Some(Ok(out)));
                }
            }
        }
    }
}
