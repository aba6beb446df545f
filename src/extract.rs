//! Sentinel-delimited result extraction.
//!
//! The debugger runtime prints its machine-readable result between
//! [`BEGIN`] and [`END`] somewhere in an otherwise interactive stdout
//! stream. [`ResultExtractor`] is a chunk-at-a-time state machine that
//! recovers that text; [`tap`] copies a child's stdout through to the
//! terminal while feeding the extractor.
//!
//! Sentinels are matched within a single chunk. A token split across two
//! reads is not recognized.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// Marks the start of the result payload.
pub const BEGIN: &str = "RESULT_BEGIN";

/// Marks the end of the result payload.
pub const END: &str = "RESULT_END";

const READ_BUF_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    SeekingBegin,
    Accumulating,
    Done,
}

/// Accumulates the text between the sentinels across chunks.
#[derive(Debug, Default)]
pub struct ResultExtractor {
    accumulated: String,
    phase: Phase,
}

impl ResultExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Feed one chunk. Returns the trimmed payload on the chunk that
    /// completes it, and `None` for every other call, including all calls
    /// after completion.
    pub fn feed(&mut self, chunk: &str) -> Option<String> {
        if self.phase == Phase::Done {
            return None;
        }

        // An END that precedes any BEGIN closes the payload already open
        if self.phase == Phase::Accumulating {
            if let Some(end) = chunk.find(END) {
                if chunk.find(BEGIN).map_or(true, |begin| end < begin) {
                    return Some(self.complete(&chunk[..end]));
                }
            }
        }

        let mut rest = chunk;
        if let Some(idx) = rest.find(BEGIN) {
            rest = &rest[idx + BEGIN.len()..];
            self.accumulated.clear();
            self.phase = Phase::Accumulating;
        } else if self.phase == Phase::SeekingBegin {
            return None;
        }

        if let Some(idx) = rest.find(END) {
            return Some(self.complete(&rest[..idx]));
        }

        self.accumulated.push_str(rest);
        None
    }

    fn complete(&mut self, tail: &str) -> String {
        self.accumulated.push_str(tail);
        self.phase = Phase::Done;
        let payload = std::mem::take(&mut self.accumulated);
        payload.trim().to_string()
    }
}

/// Incremental UTF-8 decoding for byte chunks.
///
/// An incomplete sequence at the end of a chunk is held back until the next
/// one; invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush whatever is still held back.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

/// Copy `reader` to `writer` chunk by chunk, feeding each chunk to a
/// [`ResultExtractor`] until it resolves.
///
/// The payload is sent on `result` exactly once. Passthrough continues after
/// that until EOF. If EOF arrives first, `result` is dropped unsent. A failed
/// write stops passthrough but not extraction; only read errors are returned.
pub async fn tap<R, W>(
    mut reader: R,
    mut writer: W,
    result: oneshot::Sender<String>,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut decoder = Utf8ChunkDecoder::default();
    let mut listener = Some((ResultExtractor::new(), result));
    let mut passthrough = true;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }

        if let Some((extractor, _)) = listener.as_mut() {
            let chunk = decoder.decode(&buf[..n]);
            trace!(bytes = n, phase = ?extractor.phase(), "Output chunk");
            if let Some(payload) = extractor.feed(&chunk) {
                debug!(payload_len = payload.len(), "Result extracted");
                if let Some((_, tx)) = listener.take() {
                    let _ = tx.send(payload);
                }
            }
        }

        if passthrough {
            let written = async {
                writer.write_all(&buf[..n]).await?;
                writer.flush().await
            }
            .await;
            if let Err(e) = written {
                warn!(error = %e, "Terminal passthrough failed, continuing to read output");
                passthrough = false;
            }
        }
    }

    if let Some((mut extractor, tx)) = listener.take() {
        let tail = decoder.finish();
        if let Some(payload) = extractor.feed(&tail) {
            let _ = tx.send(payload);
        } else {
            debug!(phase = ?extractor.phase(), "Output ended without a result");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(chunks: &[&str]) -> Vec<String> {
        let mut extractor = ResultExtractor::new();
        chunks.iter().filter_map(|c| extractor.feed(c)).collect()
    }

    #[test]
    fn payload_in_single_chunk_after_noise() {
        let results = feed_all(&["noise ", "RESULT_BEGIN{\"a\":1}RESULT_END trailing"]);
        assert_eq!(results, vec![r#"{"a":1}"#]);
    }

    #[test]
    fn payload_spanning_chunks() {
        let results = feed_all(&["RESULT_BEGIN", "partial-data-", "more-data", "RESULT_END"]);
        assert_eq!(results, vec!["partial-data-more-data"]);
    }

    #[test]
    fn payload_is_trimmed() {
        let results = feed_all(&["(gdb) run\nRESULT_BEGIN\n  {\"ok\":true}", "\n\nRESULT_END\n"]);
        assert_eq!(results, vec![r#"{"ok":true}"#]);
    }

    #[test]
    fn never_resolves_without_end() {
        let mut extractor = ResultExtractor::new();
        for chunk in ["noise", "RESULT_BEGIN", "{\"a\":", "1}", "more"] {
            assert!(extractor.feed(chunk).is_none());
        }
        assert_eq!(extractor.phase(), Phase::Accumulating);
    }

    #[test]
    fn end_before_begin_is_ignored() {
        let mut extractor = ResultExtractor::new();
        assert!(extractor.feed("stray RESULT_END").is_none());
        assert_eq!(extractor.phase(), Phase::SeekingBegin);
        assert_eq!(extractor.feed("RESULT_BEGIN x RESULT_END").as_deref(), Some("x"));
    }

    #[test]
    fn end_before_new_begin_completes_open_payload() {
        let mut extractor = ResultExtractor::new();
        assert!(extractor.feed("RESULT_BEGIN first-").is_none());
        assert_eq!(
            extractor.feed("half RESULT_END (gdb) RESULT_BEGIN").as_deref(),
            Some("first-half")
        );
        assert_eq!(extractor.phase(), Phase::Done);
    }

    #[test]
    fn begin_before_end_restarts_payload() {
        let results = feed_all(&["RESULT_BEGIN stale", "RESULT_BEGIN fresh RESULT_END"]);
        assert_eq!(results, vec!["fresh"]);
    }

    #[test]
    fn resolves_exactly_once() {
        let results = feed_all(&["RESULT_BEGIN 1 RESULT_END", "RESULT_BEGIN 2 RESULT_END"]);
        assert_eq!(results, vec!["1"]);
    }

    #[test]
    fn empty_payload() {
        assert_eq!(feed_all(&["RESULT_BEGIN   RESULT_END"]), vec![""]);
    }

    #[test]
    fn split_sentinel_is_not_detected() {
        let mut extractor = ResultExtractor::new();
        assert!(extractor.feed("RESULT_BE").is_none());
        assert!(extractor.feed("GIN payload RESULT_END").is_none());
        assert_eq!(extractor.phase(), Phase::SeekingBegin);
    }

    #[test]
    fn decoder_joins_split_multibyte_char() {
        let bytes = "héllo".as_bytes();
        let mut decoder = Utf8ChunkDecoder::default();
        let first = decoder.decode(&bytes[..2]);
        let second = decoder.decode(&bytes[2..]);
        assert_eq!(first, "h");
        assert_eq!(format!("{first}{second}"), "héllo");
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(decoder.decode(b"\xe2\x82"), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[tokio::test]
    async fn tap_passes_output_through_and_extracts() {
        let reader = tokio_test::io::Builder::new()
            .read(b"noise ")
            .read(b"RESULT_BEGIN{\"a\":1}RESULT_END trailing")
            .read(b"\n(gdb) quit\n")
            .build();
        let mut terminal = Vec::new();
        let (tx, rx) = oneshot::channel();

        tap(reader, &mut terminal, tx).await.unwrap();

        assert_eq!(rx.await.unwrap(), r#"{"a":1}"#);
        assert_eq!(
            String::from_utf8(terminal).unwrap(),
            "noise RESULT_BEGIN{\"a\":1}RESULT_END trailing\n(gdb) quit\n"
        );
    }

    #[tokio::test]
    async fn tap_accumulates_across_reads() {
        let reader = tokio_test::io::Builder::new()
            .read(b"RESULT_BEGIN")
            .read(b"partial-data-")
            .read(b"more-data")
            .read(b"RESULT_END")
            .build();
        let (tx, rx) = oneshot::channel();

        tap(reader, Vec::new(), tx).await.unwrap();

        assert_eq!(rx.await.unwrap(), "partial-data-more-data");
    }

    /// Writer that fails every write, like a closed terminal pipe.
    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn tap_extracts_when_terminal_write_fails() {
        let reader = tokio_test::io::Builder::new()
            .read(b"noise ")
            .read(b"RESULT_BEGIN {\"a\":1} RESULT_END")
            .read(b" trailing")
            .build();
        let (tx, rx) = oneshot::channel();

        tap(reader, BrokenPipe, tx).await.unwrap();

        assert_eq!(rx.await.unwrap(), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn tap_drops_sender_at_eof_without_result() {
        let reader = tokio_test::io::Builder::new()
            .read(b"RESULT_BEGIN never finished")
            .build();
        let (tx, rx) = oneshot::channel();

        tap(reader, Vec::new(), tx).await.unwrap();

        assert!(rx.await.is_err());
    }
}
