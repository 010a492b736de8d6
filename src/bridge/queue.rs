//! Output line queue
//!
//! One background task reads the debugger's output a line at a time and
//! pushes each line into an unbounded channel. The script side pops lines in
//! the order they were written. When the output ends the task exits, its
//! sender drops, and a drained queue reports [`Next::Closed`] instead of
//! waiting forever.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::testing::Transcript;

/// Result of waiting for the next line
#[derive(Debug, PartialEq, Eq)]
pub enum Next {
    Line(String),
    /// Output ended and every line has been consumed
    Closed,
    /// The deadline passed first
    TimedOut,
}

/// Lines produced by the debugger, consumed once each in order
pub struct OutputLineQueue {
    rx: mpsc::UnboundedReceiver<String>,
    pump: Option<JoinHandle<()>>,
}

impl OutputLineQueue {
    /// Start pumping `reader` into a new queue
    pub fn pump<R>(reader: R, transcript: Transcript) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        let pump = tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        tracing::debug!("<<< {}", line);
                        transcript.received(&line);
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Error reading debugger output: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("Debugger output closed");
        });

        Self {
            rx,
            pump: Some(pump),
        }
    }

    /// Wait for the next line until `deadline`
    pub async fn next_before(&mut self, deadline: Instant) -> Next {
        match tokio::time::timeout_at(deadline, self.rx.recv()).await {
            Ok(Some(line)) => Next::Line(line),
            Ok(None) => Next::Closed,
            Err(_) => Next::TimedOut,
        }
    }

    /// Let the pump finish on its own for up to `grace`, then cancel it
    pub async fn stop(&mut self, grace: Duration) {
        let Some(mut pump) = self.pump.take() else {
            return;
        };
        if tokio::time::timeout(grace, &mut pump).await.is_err() {
            tracing::debug!("Cancelling output reader");
            pump.abort();
        }
    }

    /// Cancel the pump immediately
    pub fn abort(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for OutputLineQueue {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lines_arrive_in_order_then_close() {
        let data: &[u8] = b"first\nsecond\r\nthird";
        let transcript = Transcript::new();
        let mut queue = OutputLineQueue::pump(data, transcript.clone());
        let deadline = Instant::now() + Duration::from_secs(5);

        assert_eq!(queue.next_before(deadline).await, Next::Line("first".into()));
        assert_eq!(queue.next_before(deadline).await, Next::Line("second".into()));
        assert_eq!(queue.next_before(deadline).await, Next::Line("third".into()));
        assert_eq!(queue.next_before(deadline).await, Next::Closed);
        assert_eq!(transcript.lines(), vec!["> first", "> second", "> third"]);
    }

    #[tokio::test]
    async fn test_times_out_while_output_is_open() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut queue = OutputLineQueue::pump(reader, Transcript::new());
        let deadline = Instant::now() + Duration::from_millis(50);
        assert_eq!(queue.next_before(deadline).await, Next::TimedOut);
        queue.stop(Duration::from_millis(10)).await;
    }
}
