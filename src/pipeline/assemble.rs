//! Joins per-segment audio into one output stream.
//!
//! Buffers are written back to back in index order with no re-encoding or
//! re-muxing. MP3 tolerates concatenated frame sequences from independent
//! encodes; containers with global headers (WAV, MP4) do not, so the
//! synthesizer's response format must be one of the former.

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Errors raised while writing the joined stream.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("failed to write assembled audio: {0}")]
    Io(#[from] std::io::Error),
}

/// Write `buffers` to `writer` in order and flush. Returns total bytes written.
pub async fn assemble<W>(buffers: &[Vec<u8>], writer: &mut W) -> Result<u64, AssemblyError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    for buf in buffers {
        writer.write_all(buf).await?;
        written += buf.len() as u64;
    }
    writer.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;

    /// Writer that accepts `budget` bytes and then fails.
    struct FailingWriter {
        budget: usize,
    }

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            if self.budget == 0 {
                return Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "disk full",
                )));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn concatenates_in_given_order() {
        let buffers = vec![b"ID3".to_vec(), Vec::new(), b"\xff\xfb".to_vec(), b"tail".to_vec()];
        let mut out = Vec::new();

        let written = assemble(&buffers, &mut out).await.unwrap();

        assert_eq!(written, 9);
        assert_eq!(out, b"ID3\xff\xfbtail");
    }

    #[tokio::test]
    async fn no_buffers_writes_nothing() {
        let mut out = Vec::new();
        assert_eq!(assemble(&[], &mut out).await.unwrap(), 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let buffers = vec![vec![1u8; 8], vec![2u8; 8]];
        let mut writer = FailingWriter { budget: 10 };

        let err = assemble(&buffers, &mut writer).await.unwrap_err();
        assert!(matches!(err, AssemblyError::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
    }

    #[tokio::test]
    async fn writes_into_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("joined.mp3");
        let mut file = tokio::fs::File::create(&path).await.unwrap();

        assemble(&[b"one".to_vec(), b"two".to_vec()], &mut file).await.unwrap();
        drop(file);

        assert_eq!(std::fs::read(&path).unwrap(), b"onetwo");
    }
}
