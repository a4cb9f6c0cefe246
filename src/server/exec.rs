//! Streaming subprocess execution
//!
//! Runs an external process and hands its combined stdout/stderr back as a
//! sequence of [`StreamEvent::Chunk`]s, terminated by exactly one
//! [`StreamEvent::Finished`]. Over HTTP the status line is already on the wire
//! by the time the process ends, so the outcome is reported in the body: an
//! `OS Error:` line on failure and a trailing sentinel line either way.

use std::convert::Infallible;
use std::future::Future;
use std::process::Stdio;

use axum::body::Body;
use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// First line of every stream, sent before the process starts so the caller
/// gets headers and a first chunk immediately
pub const OUTPUT_MARKER: &str = "Output:\n";

/// Trailing line after a zero exit status
pub const SENTINEL_OK: &str = "[exit] ok\n";

/// Trailing line after a spawn failure or non-zero exit status
pub const SENTINEL_FAILED: &str = "[exit] failed\n";

const READ_BUF_SIZE: usize = 8 * 1024;
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(Bytes),
    Finished(Result<(), String>),
}

/// Spawn `command` and stream its output.
///
/// The marker line is sent first. `hold` is then awaited before the process
/// is spawned, and its output is dropped only after the process has exited,
/// so callers can tie a lock or temporary files to the lifetime of the run
/// without delaying the response headers.
pub fn run_streaming<F, G>(command: Command, hold: F) -> mpsc::Receiver<StreamEvent>
where
    F: Future<Output = G> + Send + 'static,
    G: Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let _ = tx
            .send(StreamEvent::Chunk(Bytes::from_static(OUTPUT_MARKER.as_bytes())))
            .await;

        let _held = hold.await;
        let result = drive(command, &tx).await;
        match &result {
            Ok(()) => info!("Streaming command finished"),
            Err(e) => warn!("Streaming command failed: {}", e),
        }

        let _ = tx.send(StreamEvent::Finished(result)).await;
    });

    rx
}

async fn drive(mut command: Command, tx: &mpsc::Sender<StreamEvent>) -> Result<(), String> {
    info!("Exec command {:?}", command.as_std());

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| e.to_string())?;

    tokio::join!(
        forward(child.stdout.take(), tx.clone()),
        forward(child.stderr.take(), tx.clone()),
    );

    let status = child.wait().await.map_err(|e| e.to_string())?;
    if status.success() {
        Ok(())
    } else {
        Err(status.to_string())
    }
}

/// Copy one pipe into the channel as it is read.
///
/// Once the receiver is gone the pipe is still drained so the process can
/// run to completion instead of blocking on a full pipe.
async fn forward<R>(reader: Option<R>, tx: mpsc::Sender<StreamEvent>)
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };

    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut receiver_gone = false;
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if receiver_gone {
                    continue;
                }
                let chunk = Bytes::copy_from_slice(&buf[..n]);
                if tx.send(StreamEvent::Chunk(chunk)).await.is_err() {
                    debug!("Stream receiver dropped, draining remaining output");
                    receiver_gone = true;
                }
            }
            Err(e) => {
                warn!("Failed to read command output: {}", e);
                break;
            }
        }
    }
}

/// Turns events into body bytes, keeping the terminal lines on their own line
#[derive(Debug)]
pub struct StreamRenderer {
    at_line_start: bool,
}

impl Default for StreamRenderer {
    fn default() -> Self {
        Self {
            at_line_start: true,
        }
    }
}

impl StreamRenderer {
    pub fn render(&mut self, event: StreamEvent) -> Bytes {
        match event {
            StreamEvent::Chunk(bytes) => {
                if let Some(last) = bytes.last() {
                    self.at_line_start = *last == b'\n';
                }
                bytes
            }
            StreamEvent::Finished(result) => {
                let mut text = String::new();
                if !self.at_line_start {
                    text.push('\n');
                }
                match result {
                    Ok(()) => text.push_str(SENTINEL_OK),
                    Err(detail) => {
                        text.push_str(&format!("OS Error: {}\n", detail));
                        text.push_str(SENTINEL_FAILED);
                    }
                }
                self.at_line_start = true;
                Bytes::from(text)
            }
        }
    }
}

/// HTTP body that writes every event as soon as it arrives
pub fn into_body(rx: mpsc::Receiver<StreamEvent>) -> Body {
    let mut renderer = StreamRenderer::default();
    let stream =
        ReceiverStream::new(rx).map(move |event| Ok::<_, Infallible>(renderer.render(event)));
    Body::from_stream(stream)
}
