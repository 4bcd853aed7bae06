//! Client-side mirror of the remote scan history.

use std::collections::HashSet;
use std::future::Future;

use tracing::{debug, warn};

use crate::client::ScanApiClient;
use crate::error::{HistoryDeleteError, HistoryLoadError};
use crate::types::{HistoryEntry, HistoryResults, HostRecord};

/// Remote store the cache reconciles against.
pub trait HistoryStore {
    fn list(&self) -> impl Future<Output = Result<Vec<HistoryEntry>, HistoryLoadError>> + Send;
    fn remove(&self, id: &str) -> impl Future<Output = Result<(), HistoryDeleteError>> + Send;
    /// Download link for a session's CSV export, if one can be built.
    fn csv_url(&self, id: &str) -> Option<String>;
}

impl HistoryStore for ScanApiClient {
    async fn list(&self) -> Result<Vec<HistoryEntry>, HistoryLoadError> {
        self.fetch_history().await
    }

    async fn remove(&self, id: &str) -> Result<(), HistoryDeleteError> {
        self.delete_history(id).await
    }

    fn csv_url(&self, id: &str) -> Option<String> {
        self.csv_export_url(id)
            .map_err(|e| warn!(id, error = %e, "no csv link for history entry"))
            .ok()
    }
}

/// What the presentation is currently showing from history.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Empty,
    Session {
        id: String,
        target: String,
        timestamp: String,
        hosts: Vec<HostRecord>,
        csv_url: Option<String>,
    },
    /// Placeholder shown after the viewed entry was deleted.
    Deleted,
}

impl ActiveView {
    pub fn id(&self) -> Option<&str> {
        match self {
            ActiveView::Session { id, .. } => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct HistoryCache {
    entries: Vec<HistoryEntry>,
    view: ActiveView,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn view(&self) -> &ActiveView {
        &self.view
    }

    /// Replace the local list with the remote one. On failure the current
    /// list is left untouched and the error is returned for diagnostics.
    pub async fn reload<S: HistoryStore>(&mut self, store: &S) -> Result<usize, HistoryLoadError> {
        let fetched = match store.list().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, kept = self.entries.len(), "history reload failed");
                return Err(e);
            }
        };

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(fetched.len());
        for entry in fetched {
            if seen.insert(entry.id.clone()) {
                entries.push(entry);
            } else {
                warn!(id = %entry.id, "dropping duplicate history id");
            }
        }
        debug!(count = entries.len(), "history reloaded");
        self.entries = entries;
        Ok(self.entries.len())
    }

    /// Make `id` the active view and return its stored results.
    pub fn select<S: HistoryStore>(&mut self, id: &str, store: &S) -> Option<&HistoryResults> {
        let entry = self.entries.iter().find(|e| e.id == id)?;
        self.view = ActiveView::Session {
            id: entry.id.clone(),
            target: entry.target.clone(),
            timestamp: entry.timestamp.clone(),
            hosts: entry.results.hosts(),
            csv_url: store.csv_url(&entry.id),
        };
        Some(&entry.results)
    }

    /// Delete `id` remotely; the local entry goes only after the remote confirms.
    pub async fn delete<S: HistoryStore>(
        &mut self,
        id: &str,
        store: &S,
    ) -> Result<(), HistoryDeleteError> {
        if self.get(id).is_none() {
            return Err(HistoryDeleteError::UnknownEntry(id.to_string()));
        }
        if let Err(e) = store.remove(id).await {
            warn!(id, error = %e, "history delete failed; entry retained");
            return Err(e);
        }

        self.entries.retain(|e| e.id != id);
        if self.view.id() == Some(id) {
            self.view = ActiveView::Deleted;
        }
        Ok(())
    }
}
