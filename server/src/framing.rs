//! Stream framing.
//!
//! A frame reader owns one connection's read half and turns the byte
//! stream into whole frames: it emits exactly one message per frame,
//! never a partial one, and terminates by emitting exactly one error.
//! Frames and errors travel on separate channels so the connection loop
//! can treat them as distinct events.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

/// Interprets the frame size prefix.
pub type SizeFn = Arc<dyn Fn(&[u8]) -> usize + Send + Sync>;

/// Drives one connection's read half until the stream ends.
///
/// Implementations must buffer partial reads internally: a frame is only
/// ever emitted whole. The first IO error ends the reader after it is
/// forwarded on the error channel. A closed frame channel means the
/// connection loop is gone and the reader should just return.
#[async_trait]
pub trait FrameReader: Send + Sync {
    async fn run(
        &self,
        io: Box<dyn AsyncRead + Send + Unpin>,
        frames: mpsc::Sender<Bytes>,
        errors: mpsc::Sender<io::Error>,
    );
}

/// The default framing: a fixed-width size chunk followed by exactly
/// that many body bytes. The wire default is a big-endian `u16`.
pub struct LengthPrefixReader {
    size_chunk_len: usize,
    size_fn: SizeFn,
}

impl LengthPrefixReader {
    pub fn new(size_chunk_len: usize, size_fn: SizeFn) -> Self {
        Self {
            size_chunk_len,
            size_fn,
        }
    }

    /// A `size_chunk_len`-byte big-endian size prefix.
    pub fn big_endian(size_chunk_len: usize) -> Self {
        Self::new(
            size_chunk_len,
            Arc::new(|chunk| {
                chunk
                    .iter()
                    .fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte))
            }),
        )
    }
}

impl Default for LengthPrefixReader {
    fn default() -> Self {
        Self::big_endian(2)
    }
}

#[async_trait]
impl FrameReader for LengthPrefixReader {
    async fn run(
        &self,
        mut io: Box<dyn AsyncRead + Send + Unpin>,
        frames: mpsc::Sender<Bytes>,
        errors: mpsc::Sender<io::Error>,
    ) {
        loop {
            let mut size_chunk = vec![0u8; self.size_chunk_len];
            if let Err(error) = io.read_exact(&mut size_chunk).await {
                let _ = errors.send(error).await;
                return;
            }

            let mut body = vec![0u8; (self.size_fn)(&size_chunk)];
            if let Err(error) = io.read_exact(&mut body).await {
                let _ = errors.send(error).await;
                return;
            }

            if frames.send(Bytes::from(body)).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn channels() -> (
        mpsc::Sender<Bytes>,
        mpsc::Receiver<Bytes>,
        mpsc::Sender<io::Error>,
        mpsc::Receiver<io::Error>,
    ) {
        let (frame_tx, frame_rx) = mpsc::channel(16);
        let (error_tx, error_rx) = mpsc::channel(1);
        (frame_tx, frame_rx, error_tx, error_rx)
    }

    #[tokio::test]
    async fn emits_one_message_per_frame() {
        let (mut client, server) = tokio::io::duplex(256);
        let (frame_tx, mut frames, error_tx, _errors) = channels();

        tokio::spawn(async move {
            LengthPrefixReader::default()
                .run(Box::new(server), frame_tx, error_tx)
                .await;
        });

        for body in [&b"1000AA"[..], &b"1000BB"[..]] {
            client
                .write_all(&(body.len() as u16).to_be_bytes())
                .await
                .unwrap();
            client.write_all(body).await.unwrap();
        }

        assert_eq!(frames.recv().await.unwrap(), Bytes::from_static(b"1000AA"));
        assert_eq!(frames.recv().await.unwrap(), Bytes::from_static(b"1000BB"));
    }

    #[tokio::test]
    async fn reassembles_frames_split_across_writes() {
        let (mut client, server) = tokio::io::duplex(256);
        let (frame_tx, mut frames, error_tx, _errors) = channels();

        tokio::spawn(async move {
            LengthPrefixReader::default()
                .run(Box::new(server), frame_tx, error_tx)
                .await;
        });

        client.write_all(&[0x00]).await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(&[0x06]).await.unwrap();
        client.write_all(b"1000").await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(b"XY").await.unwrap();

        assert_eq!(frames.recv().await.unwrap(), Bytes::from_static(b"1000XY"));
    }

    #[tokio::test]
    async fn stream_end_terminates_with_one_error() {
        let (mut client, server) = tokio::io::duplex(256);
        let (frame_tx, mut frames, error_tx, mut errors) = channels();

        tokio::spawn(async move {
            LengthPrefixReader::default()
                .run(Box::new(server), frame_tx, error_tx)
                .await;
        });

        client.write_all(&[0x00, 0x04]).await.unwrap();
        client.write_all(b"DONE").await.unwrap();
        client.shutdown().await.unwrap();
        drop(client);

        assert_eq!(frames.recv().await.unwrap(), Bytes::from_static(b"DONE"));
        let error = errors.recv().await.unwrap();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
        assert!(frames.recv().await.is_none());
    }

    #[tokio::test]
    async fn custom_size_chunk_width() {
        let (mut client, server) = tokio::io::duplex(256);
        let (frame_tx, mut frames, error_tx, _errors) = channels();

        let reader = LengthPrefixReader::new(1, Arc::new(|chunk| chunk[0] as usize));
        tokio::spawn(async move {
            reader.run(Box::new(server), frame_tx, error_tx).await;
        });

        client.write_all(&[3]).await.unwrap();
        client.write_all(b"abc").await.unwrap();

        assert_eq!(frames.recv().await.unwrap(), Bytes::from_static(b"abc"));
    }
}
