//! Session state machine: request, read loop, event application, finalisation.
//!
//! `Idle -> Requesting -> Streaming -> {Completed, Failed}`. Only transport
//! failures (and cancellation) end a session in `Failed`; a malformed frame is
//! logged and skipped, and an `error` event is folded into the view without
//! ending the stream.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ScanApiClient;
use crate::error::{FrameDecodeError, SessionError};
use crate::event::{decode_frame, ScanEvent};
use crate::session::{LogEntry, ScanSession, SessionState};
use crate::stream::{ChunkSource, FrameStream};

pub const CANCELLED_MESSAGE: &str = "Scan cancelled.";

/// Presentation hooks, called in the order things happen. All default to no-ops.
pub trait SessionObserver {
    fn on_state(&mut self, _state: SessionState) {}
    fn on_event(&mut self, _event: &ScanEvent, _session: &ScanSession) {}
    fn on_log(&mut self, _entry: &LogEntry) {}
    fn on_decode_error(&mut self, _error: &FrameDecodeError) {}
}

impl SessionObserver for () {}

/// Clears the in-flight flag when the session ends, however it ends.
struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns at most one in-flight session at a time.
#[derive(Debug)]
pub struct ScanController {
    client: ScanApiClient,
    active: AtomicBool,
}

impl ScanController {
    pub fn new(client: ScanApiClient) -> Self {
        Self { client, active: AtomicBool::new(false) }
    }

    pub fn client(&self) -> &ScanApiClient {
        &self.client
    }

    /// Whether a session is currently `Requesting` or `Streaming`.
    pub fn is_busy(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Run a full session against the server: `POST /scan`, then ingest the stream.
    ///
    /// Returns the final session in a terminal state. `Err` means the command was
    /// rejected before any state change (empty target, or a session already running).
    pub async fn start_session<O: SessionObserver>(
        &self,
        target: &str,
        cancel: CancellationToken,
        observer: &mut O,
    ) -> Result<ScanSession, SessionError> {
        let target = validate_target(target)?;
        let _guard = self.begin()?;

        let mut session = ScanSession::new(target);
        transition(&mut session, SessionState::Requesting, observer)?;

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = self.client.start_scan(target) => Some(res),
        };
        match response {
            None => finish_failed(&mut session, CANCELLED_MESSAGE.to_string(), observer)?,
            Some(Err(e)) => {
                warn!(scan_target = target, error = %e, "scan request failed");
                finish_failed(&mut session, format!("Request Error: {e}"), observer)?;
            }
            Some(Ok(body)) => stream_session(&mut session, body, &cancel, observer).await?,
        }
        Ok(session)
    }

    /// Run a session over an already-open chunk source, e.g. a captured feed.
    pub async fn ingest<S, O>(
        &self,
        target: &str,
        source: S,
        cancel: CancellationToken,
        observer: &mut O,
    ) -> Result<ScanSession, SessionError>
    where
        S: ChunkSource,
        O: SessionObserver,
    {
        let target = validate_target(target)?;
        let _guard = self.begin()?;

        let mut session = ScanSession::new(target);
        transition(&mut session, SessionState::Requesting, observer)?;
        stream_session(&mut session, source, &cancel, observer).await?;
        Ok(session)
    }

    fn begin(&self) -> Result<ActiveGuard<'_>, SessionError> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::Busy)?;
        Ok(ActiveGuard(&self.active))
    }
}

fn validate_target(target: &str) -> Result<&str, SessionError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(SessionError::EmptyTarget);
    }
    Ok(target)
}

fn transition<O: SessionObserver>(
    session: &mut ScanSession,
    next: SessionState,
    observer: &mut O,
) -> Result<(), SessionError> {
    session.advance(next)?;
    info!(scan_target = %session.target, state = ?next, "session transition");
    observer.on_state(next);
    Ok(())
}

fn finish_failed<O: SessionObserver>(
    session: &mut ScanSession,
    reason: String,
    observer: &mut O,
) -> Result<(), SessionError> {
    let from = session.log.len();
    session.fail(reason)?;
    info!(scan_target = %session.target, "session failed");
    observer.on_state(SessionState::Failed);
    emit_log(session, from, observer);
    Ok(())
}

fn emit_log<O: SessionObserver>(session: &ScanSession, from: usize, observer: &mut O) {
    for entry in &session.log[from..] {
        observer.on_log(entry);
    }
}

async fn stream_session<S, O>(
    session: &mut ScanSession,
    source: S,
    cancel: &CancellationToken,
    observer: &mut O,
) -> Result<(), SessionError>
where
    S: ChunkSource,
    O: SessionObserver,
{
    transition(session, SessionState::Streaming, observer)?;
    let mut frames = FrameStream::new(source);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = frames.next_frame() => Some(next),
        };
        let Some(next) = next else {
            return finish_failed(session, CANCELLED_MESSAGE.to_string(), observer);
        };

        match next {
            Ok(Some(frame)) => match decode_frame(&frame) {
                Ok(event) => {
                    let from = session.log.len();
                    session.apply(&event);
                    observer.on_event(&event, session);
                    emit_log(session, from, observer);
                }
                Err(e) => {
                    warn!(error = %e, frame = %frame, "skipping malformed frame");
                    session.decode_errors += 1;
                    observer.on_decode_error(&e);
                }
            },
            Ok(None) => {
                debug!(chunks = frames.chunks_read(), "stream ended");
                session.complete()?;
                info!(scan_target = %session.target, hosts = session.host_count, "session completed");
                observer.on_state(SessionState::Completed);
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "stream read failed");
                return finish_failed(session, format!("Request Error: {e}"), observer);
            }
        }
    }
}
