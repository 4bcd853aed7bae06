//! Aggregate view of one scan session, built by folding events in arrival order.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::event::ScanEvent;
use crate::types::HostRecord;

/// Status text containing this marker reports an in-progress sub-step and
/// does not replace the summary line.
pub const TRANSIENT_STATUS_MARKER: &str = "Scanning";

pub const INITIAL_SUMMARY: &str = "Initializing...";
pub const ERROR_SUMMARY: &str = "Scan encountered an error.";

/// Lifecycle of a session. Transitions only ever move forward.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
}

impl SessionState {
    fn rank(self) -> u8 {
        match self {
            SessionState::Idle => 0,
            SessionState::Requesting => 1,
            SessionState::Streaming => 2,
            SessionState::Completed | SessionState::Failed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }

    /// Whether `next` is reachable from `self` in one step.
    pub fn can_advance_to(self, next: SessionState) -> bool {
        match (self, next) {
            (SessionState::Idle, SessionState::Requesting) => true,
            (SessionState::Requesting, SessionState::Streaming | SessionState::Failed) => true,
            (SessionState::Streaming, SessionState::Completed | SessionState::Failed) => true,
            _ => false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Error,
}

/// One user-facing line of the session log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Info, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: LogLevel::Error, message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }
}

/// Running host count, ordered log and ordered host records of one session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanSession {
    pub target: String,
    pub state: SessionState,
    pub host_count: u64,
    pub summary: String,
    pub log: Vec<LogEntry>,
    pub hosts: Vec<HostRecord>,
    /// Frames skipped because their payload could not be decoded.
    #[serde(default)]
    pub decode_errors: u64,
}

impl ScanSession {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            state: SessionState::Idle,
            host_count: 0,
            summary: INITIAL_SUMMARY.to_string(),
            log: Vec::new(),
            hosts: Vec::new(),
            decode_errors: 0,
        }
    }

    /// Fold one event into the aggregate. Never reorders or deduplicates.
    pub fn apply(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::Status { message } => {
                self.log.push(LogEntry::info(message.clone()));
                if !message.contains(TRANSIENT_STATUS_MARKER) {
                    self.summary = message.clone();
                }
            }
            ScanEvent::HostResult { data } => {
                self.host_count += 1;
                self.log.push(LogEntry::info(format!(
                    "Host {} ({}) is {}",
                    data.host,
                    data.display_name(),
                    data.state
                )));
                self.hosts.push(data.clone());
                self.summary = format!("Found {} hosts so far...", self.host_count);
            }
            ScanEvent::Error { message } => {
                self.log.push(LogEntry::error(format!("Error: {message}")));
                self.summary = ERROR_SUMMARY.to_string();
            }
            ScanEvent::Unknown => {}
        }
    }

    /// Move to `next`, rejecting anything but a single forward step.
    pub fn advance(&mut self, next: SessionState) -> Result<(), SessionError> {
        if !self.state.can_advance_to(next) {
            return Err(SessionError::InvalidTransition { from: self.state, to: next });
        }
        debug_assert!(next.rank() > self.state.rank());
        self.state = next;
        Ok(())
    }

    /// Clean end of stream: report the final host count.
    pub fn complete(&mut self) -> Result<(), SessionError> {
        self.advance(SessionState::Completed)?;
        self.summary = format!("Scan Finished: Total {} hosts discovered.", self.host_count);
        Ok(())
    }

    /// Transport failure or cancellation: log the reason and stop.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), SessionError> {
        self.advance(SessionState::Failed)?;
        self.log.push(LogEntry::error(reason));
        Ok(())
    }

    pub fn error_count(&self) -> usize {
        self.log.iter().filter(|e| e.is_error()).count()
    }
}

/// Replay `events` into a fresh session for `target`.
pub fn fold_events<'a>(
    target: impl Into<String>,
    events: impl IntoIterator<Item = &'a ScanEvent>,
) -> ScanSession {
    let mut session = ScanSession::new(target);
    for event in events {
        session.apply(event);
    }
    session
}
