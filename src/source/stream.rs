//! Stream-based data source.
//!
//! Receives snapshots as newline-delimited JSON from an async byte stream
//! such as a TCP connection.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use sensorwatch_types::Snapshot;

use super::DataSource;

/// A data source fed by a background reader task.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use sensorwatch::StreamSource;
///
/// # tokio_test::block_on(async {
/// let data = b"{\"now\":\"2024-05-01T12:00:00Z\"}\n";
/// let source = StreamSource::spawn(Cursor::new(data.to_vec()), "example");
/// # });
/// ```
#[derive(Debug)]
pub struct StreamSource {
    receiver: mpsc::Receiver<Snapshot>,
    description: String,
    shared_error: Arc<Mutex<Option<String>>>,
    last_error: Option<String>,
}

impl StreamSource {
    /// Spawn a task reading one JSON snapshot per line from `reader`.
    ///
    /// Blank lines are ignored and unparseable lines are skipped.
    pub fn spawn<R>(reader: R, description: &str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(16);
        let shared_error = Arc::new(Mutex::new(None));
        let error_handle = Arc::clone(&shared_error);

        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        *error_handle.lock() = Some("Connection closed".to_string());
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Snapshot>(trimmed) {
                            Ok(snapshot) => {
                                *error_handle.lock() = None;
                                if tx.send(snapshot).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "skipping unparseable snapshot line");
                                *error_handle.lock() = Some(format!("Parse error: {}", e));
                            }
                        }
                    }
                    Err(e) => {
                        *error_handle.lock() = Some(format!("Read error: {}", e));
                        break;
                    }
                }
            }
        });

        Self::with_receiver(rx, description, shared_error)
    }

    /// Create a source fed by raw JSON payloads, one snapshot per message.
    pub fn from_bytes_channel(mut rx: mpsc::Receiver<Vec<u8>>, description: &str) -> Self {
        let (tx, snapshot_rx) = mpsc::channel(16);
        let shared_error = Arc::new(Mutex::new(None));
        let error_handle = Arc::clone(&shared_error);

        tokio::spawn(async move {
            while let Some(bytes) = rx.recv().await {
                match serde_json::from_slice::<Snapshot>(&bytes) {
                    Ok(snapshot) => {
                        *error_handle.lock() = None;
                        if tx.send(snapshot).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping unparseable snapshot payload");
                        *error_handle.lock() = Some(format!("Parse error: {}", e));
                    }
                }
            }
        });

        Self::with_receiver(snapshot_rx, description, shared_error)
    }

    fn with_receiver(
        receiver: mpsc::Receiver<Snapshot>,
        description: &str,
        shared_error: Arc<Mutex<Option<String>>>,
    ) -> Self {
        Self {
            receiver,
            description: format!("stream: {}", description),
            shared_error,
            last_error: None,
        }
    }
}

impl DataSource for StreamSource {
    fn poll(&mut self) -> Option<Snapshot> {
        let result = match self.receiver.try_recv() {
            Ok(snapshot) => Some(snapshot),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                let mut shared = self.shared_error.lock();
                if shared.is_none() {
                    *shared = Some("Stream disconnected".to_string());
                }
                None
            }
        };
        self.last_error = self.shared_error.lock().clone();
        result
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    fn sample_json() -> &'static str {
        r#"{"now":"2024-05-01T12:00:00Z","latestValues":{"1301":0.0}}"#
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_stream_source_spawn() {
        let data = format!("{}\n", sample_json());
        let mut source = StreamSource::spawn(Cursor::new(data), "test");

        settle().await;

        let snapshot = source.poll().unwrap();
        assert_eq!(snapshot.latest("1301"), Some(0.0));
    }

    #[tokio::test]
    async fn test_stream_source_multiple_snapshots() {
        let data = format!("{}\n\n{}\n", sample_json(), sample_json());
        let mut source = StreamSource::spawn(Cursor::new(data), "test");

        settle().await;

        assert!(source.poll().is_some());
        assert!(source.poll().is_some());
        assert!(source.poll().is_none());
    }

    #[tokio::test]
    async fn test_stream_source_description() {
        let source = StreamSource::spawn(Cursor::new(""), "tcp://localhost:9090");
        assert_eq!(source.description(), "stream: tcp://localhost:9090");
    }

    #[tokio::test]
    async fn test_stream_source_from_bytes_channel() {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(16);
        let mut source = StreamSource::from_bytes_channel(rx, "test-channel");

        tx.send(b"garbage".to_vec()).await.unwrap();
        settle().await;
        assert!(source.poll().is_none());
        assert!(source.error().unwrap().contains("Parse error"));

        tx.send(sample_json().as_bytes().to_vec()).await.unwrap();
        settle().await;
        assert!(source.poll().is_some());
        assert!(source.error().is_none());
    }

    #[tokio::test]
    async fn test_stream_source_reports_closed_stream() {
        let data = "not valid json\n";
        let mut source = StreamSource::spawn(Cursor::new(data), "test");

        settle().await;

        assert!(source.poll().is_none());
        assert_eq!(source.error(), Some("Connection closed"));
    }
}
