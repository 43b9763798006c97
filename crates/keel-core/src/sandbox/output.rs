//! Size-capped capture of a child's output stream.

use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE: usize = 8 * 1024;

/// Captured text of one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Captured {
    pub text: String,
    /// Whether bytes past the limit were discarded
    pub truncated: bool,
}

/// Accumulates bytes up to a fixed limit and drops the rest.
#[derive(Debug)]
pub(crate) struct CappedBuffer {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl CappedBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            truncated: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        let room = self.limit.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    pub fn finish(self) -> Captured {
        Captured {
            text: String::from_utf8_lossy(&self.bytes).into_owned(),
            truncated: self.truncated,
        }
    }
}

/// Read `reader` to EOF, keeping at most `limit` bytes.
///
/// The stream is drained past the limit so the child never blocks on a full
/// pipe. A read error ends the capture with whatever was read so far.
pub(crate) async fn read_capped<R>(mut reader: R, limit: usize) -> Captured
where
    R: AsyncRead + Unpin,
{
    let mut buffer = CappedBuffer::new(limit);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.push(&chunk[..n]),
            Err(e) => {
                log::debug!("Output stream closed with error: {e}");
                break;
            }
        }
    }
    buffer.finish()
}
