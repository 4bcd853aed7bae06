use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Reported reachability of a host. Unknown wire strings are preserved verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum HostState {
    Up,
    Down,
    Other(String),
}

impl From<String> for HostState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "up" => HostState::Up,
            "down" => HostState::Down,
            _ => HostState::Other(s),
        }
    }
}

impl From<HostState> for String {
    fn from(state: HostState) -> Self {
        match state {
            HostState::Up => "up".into(),
            HostState::Down => "down".into(),
            HostState::Other(s) => s,
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostState::Up => f.write_str("up"),
            HostState::Down => f.write_str("down"),
            HostState::Other(s) => f.write_str(s),
        }
    }
}

/// One port line of a host's service table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PortRecord {
    pub port: u16,
    pub state: String,
    pub service: String,
    pub version: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRecord {
    pub protocol: String,
    #[serde(default)]
    pub ports: Vec<PortRecord>,
}

/// One discovered host as carried by a `host_result` event and stored in history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub host: String,
    #[serde(default)]
    pub hostname: Option<String>,
    pub state: HostState,
    #[serde(default)]
    pub protocols: Vec<ProtocolRecord>,
}

impl HostRecord {
    /// Hostname for display; empty names count as missing.
    pub fn display_name(&self) -> &str {
        match self.hostname.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "No Hostname",
        }
    }

    pub fn open_port_count(&self) -> usize {
        self.protocols.iter().map(|p| p.ports.len()).sum()
    }
}

/// Stored results of a past session: older rows hold a single record, newer ones an array.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum HistoryResults {
    Many(Vec<HostRecord>),
    One(HostRecord),
}

impl HistoryResults {
    /// Normalise to an ordered host list.
    pub fn hosts(&self) -> Vec<HostRecord> {
        match self {
            HistoryResults::Many(v) => v.clone(),
            HistoryResults::One(h) => vec![h.clone()],
        }
    }
}

/// One past session as listed by `GET /history`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub target: String,
    pub timestamp: String,
    pub results: HistoryResults,
}

/// History ids are integer row ids on the wire but are opaque to the client.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(u64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Num(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}
