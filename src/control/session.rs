// src/control/session.rs

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::control::protocol::{Request, Response};
use crate::engine::JobEngine;
use crate::errors::{DispatchError, Result};
use crate::types::JobId;

/// Serve requests from `reader` until EOF, a `shutdown` request, or
/// `stop` being cancelled.
///
/// Returning does not shut the engine down; the caller decides that.
pub async fn serve<R, W>(
    engine: &JobEngine,
    reader: R,
    mut writer: W,
    stop: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("control session started");
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            _ = stop.cancelled() => {
                info!("control session interrupted");
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            info!("control input closed");
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (response, keep_going) = match serde_json::from_str::<Request>(line) {
            Ok(Request::Shutdown) => (Response::stopping(), false),
            Ok(request) => (handle_request(engine, request), true),
            Err(err) => {
                warn!(error = %err, "malformed control request");
                (Response::bad_request(format!("malformed request: {err}")), true)
            }
        };

        write_response(&mut writer, &response).await?;

        if !keep_going {
            info!("shutdown requested over control channel");
            break;
        }
    }

    writer.flush().await?;
    Ok(())
}

/// Answer a single request against the engine.
pub fn handle_request(engine: &JobEngine, request: Request) -> Response {
    match request {
        Request::Submit(submit) => {
            debug!(target = %submit.target, tag = %submit.tag, "submit request");
            let (target, tag) = (submit.target.clone(), submit.tag.clone());
            match engine.submit(submit) {
                Ok(job_id) => {
                    let started_at = engine.status(&job_id).ok().map(|s| s.started_at);
                    Response::started(job_id, target, tag, started_at)
                }
                Err(err) => err.into(),
            }
        }
        Request::Status { job_id } => {
            let status = job_id
                .parse::<JobId>()
                .map_err(|_| DispatchError::JobNotFound(job_id.clone()))
                .and_then(|id| engine.status(&id));
            match status {
                Ok(status) => Response::Job(status),
                Err(err) => err.into(),
            }
        }
        Request::Shutdown => Response::stopping(),
    }
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
