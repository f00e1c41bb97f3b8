//! Streaming sessions over the frame pipeline.
//!
//! One session per client connection. Frames are processed strictly in
//! arrival order; an undecodable frame produces no response at all, and
//! no per-frame failure ends the session. The session ends only when
//! the inbound side closes.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::pipeline::{FrameResponse, Pipeline};

/// Drain inbound frame payloads in order, emitting one response per
/// decodable frame. Returns when the inbound channel closes or the
/// response receiver hangs up.
pub async fn run_session(
    pipeline: Pipeline,
    mut frames: mpsc::Receiver<String>,
    responses: mpsc::Sender<FrameResponse>,
) {
    let mut processed = 0u64;
    while let Some(payload) = frames.recv().await {
        processed += 1;
        if let Some(response) = pipeline.process_frame(payload).await {
            if responses.send(response).await.is_err() {
                tracing::info!("response receiver closed, ending session");
                return;
            }
        }
    }
    tracing::info!(frames = processed, "session ended");
}

/// Serve one session over stdio: one base64 frame per input line, one
/// JSON response object per output line. Ends at EOF.
pub async fn run_stdio_session(pipeline: Pipeline) -> std::io::Result<()> {
    let (frame_tx, frame_rx) = mpsc::channel::<String>(16);
    let (response_tx, mut response_rx) = mpsc::channel::<FrameResponse>(16);

    let session = tokio::spawn(run_session(pipeline, frame_rx, response_tx));

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = response_rx.recv().await {
            let Ok(mut line) = serde_json::to_vec(&response) else {
                continue;
            };
            line.push(b'\n');
            if stdout.write_all(&line).await.is_err() {
                break;
            }
            let _ = stdout.flush().await;
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if frame_tx.send(line).await.is_err() {
            break;
        }
    }
    drop(frame_tx);

    let _ = session.await;
    let _ = writer.await;
    Ok(())
}
