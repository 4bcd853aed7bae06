//! Error taxonomy for the scan feed client.
//!
//! Only `TransportError` changes session state. The others are recovered where
//! they occur so one bad frame or one failed history call cannot corrupt the
//! aggregate view.

use reqwest::StatusCode;
use thiserror::Error;

use crate::session::SessionState;

/// One malformed frame. Logged and skipped; ingestion continues.
#[derive(Debug, Error)]
pub enum FrameDecodeError {
    #[error("frame does not start with the data prefix")]
    MissingPrefix,
    #[error("invalid event payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// The triggering request or the stream read failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("stream read failed: {0}")]
    Read(String),
}

/// Remote history could not be fetched; the cache keeps its prior contents.
#[derive(Debug, Error)]
pub enum HistoryLoadError {
    #[error("history request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("malformed history body: {0}")]
    Decode(String),
}

/// Remote delete failed; the entry stays in the cache.
#[derive(Debug, Error)]
pub enum HistoryDeleteError {
    #[error("delete request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("no history entry with id {0}")]
    UnknownEntry(String),
    #[error(transparent)]
    Url(#[from] UrlError),
}

/// The configured server URL cannot address an endpoint.
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("invalid server url {base}: {source}")]
    Parse {
        base: String,
        #[source]
        source: url::ParseError,
    },
    #[error("server url {0} cannot carry path segments")]
    NotABase(String),
}

/// Rejections raised by the session controller before or during a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("scan target is empty")]
    EmptyTarget,
    #[error("a scan session is already in progress")]
    Busy,
    #[error("invalid session transition {from:?} -> {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },
}
