//! Transparent capture of the client's SSH identification string.
//!
//! The transport library consumes the version exchange internally, but the
//! log records need the client's exact banner. This wrapper sits between the
//! socket and the transport: it passes every byte through untouched while
//! remembering the first line the client sends (its identification string,
//! per RFC 4253 at most 255 bytes including CRLF).

use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

const MAX_ID_LINE: usize = 255;

/// Cell the captured identification string lands in, shared with the
/// connection handler
pub type SharedVersion = Arc<OnceLock<String>>;

/// Placeholder recorded when no identification line was ever seen
pub const UNKNOWN_VERSION: &str = "unknown";

pub struct VersionSniffer<S> {
    inner: S,
    captured: SharedVersion,
    acc: Vec<u8>,
    done: bool,
}

impl<S> VersionSniffer<S> {
    pub fn new(inner: S, captured: SharedVersion) -> Self {
        Self {
            inner,
            captured,
            acc: Vec::new(),
            done: false,
        }
    }

    fn observe(&mut self, bytes: &[u8]) {
        if self.done {
            return;
        }
        self.acc.extend_from_slice(bytes);

        if let Some(pos) = self.acc.iter().position(|&b| b == b'\n') {
            let mut line = &self.acc[..pos];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let _ = self
                .captured
                .set(String::from_utf8_lossy(line).into_owned());
            self.done = true;
            self.acc = Vec::new();
        } else if self.acc.len() > MAX_ID_LINE {
            // Not a well-formed identification line; keep what we saw
            let _ = self
                .captured
                .set(String::from_utf8_lossy(&self.acc[..MAX_ID_LINE]).into_owned());
            self.done = true;
            self.acc = Vec::new();
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for VersionSniffer<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            let new_bytes = buf.filled()[before..].to_vec();
            this.observe(&new_bytes);
        }
        poll
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for VersionSniffer<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
