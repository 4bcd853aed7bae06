//! Command surface: one explicitly owned controller and history cache.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::client::ScanApiClient;
use crate::controller::{ScanController, SessionObserver};
use crate::error::{HistoryDeleteError, HistoryLoadError, SessionError};
use crate::history::{ActiveView, HistoryCache};
use crate::session::{ScanSession, SessionState};
use crate::types::{HistoryEntry, HistoryResults};

#[derive(Debug)]
pub struct ScanConsole {
    controller: ScanController,
    history: HistoryCache,
}

impl ScanConsole {
    pub fn new(client: ScanApiClient) -> Self {
        Self {
            controller: ScanController::new(client),
            history: HistoryCache::new(),
        }
    }

    pub fn controller(&self) -> &ScanController {
        &self.controller
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    pub fn view(&self) -> &ActiveView {
        self.history.view()
    }

    /// Run one scan session. A completed session refreshes the history list;
    /// a failed refresh is only reported as a diagnostic.
    pub async fn start_session<O: SessionObserver>(
        &mut self,
        target: &str,
        cancel: CancellationToken,
        observer: &mut O,
    ) -> Result<ScanSession, SessionError> {
        let session = self.controller.start_session(target, cancel, observer).await?;
        if session.state == SessionState::Completed {
            if let Err(e) = self.history.reload(self.controller.client()).await {
                warn!(error = %e, "history refresh after scan failed");
            }
        }
        Ok(session)
    }

    pub async fn reload_history(&mut self) -> Result<usize, HistoryLoadError> {
        self.history.reload(self.controller.client()).await
    }

    pub fn select_history(&mut self, id: &str) -> Option<&HistoryResults> {
        self.history.select(id, self.controller.client())
    }

    pub async fn delete_history(&mut self, id: &str) -> Result<(), HistoryDeleteError> {
        self.history.delete(id, self.controller.client()).await
    }
}
