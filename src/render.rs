//! Terminal presentation of sessions and history.

use time::{macros::format_description, OffsetDateTime};

use crate::controller::SessionObserver;
use crate::error::FrameDecodeError;
use crate::history::ActiveView;
use crate::session::{LogEntry, ScanSession, SessionState};
use crate::types::{HistoryEntry, HostRecord, ProtocolRecord};

/// Prints the session log live, one timestamped line per entry.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_state(&mut self, state: SessionState) {
        if state == SessionState::Requesting {
            println!("{}", crate::session::INITIAL_SUMMARY);
        }
    }

    fn on_log(&mut self, entry: &LogEntry) {
        let line = format!("[{}] {}", clock(), entry.message);
        if entry.is_error() {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    fn on_decode_error(&mut self, error: &FrameDecodeError) {
        eprintln!("[{}] Parse error: {error}", clock());
    }
}

/// Local wall-clock time as `HH:MM:SS`, falling back to UTC when the offset is unknown.
fn clock() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| String::from("--:--:--"))
}

pub fn print_session(session: &ScanSession) {
    println!("\n{}", session.summary);
    if session.decode_errors > 0 {
        println!("Skipped {} malformed frame(s).", session.decode_errors);
    }
    print_hosts(&session.hosts);
}

pub fn print_hosts(hosts: &[HostRecord]) {
    for host in hosts {
        println!("\nHost: {} ({})  Status: {}", host.host, host.display_name(), host.state);
        if host.protocols.is_empty() {
            println!("  No open ports detected.");
            continue;
        }
        for proto in &host.protocols {
            print_port_table(proto);
        }
    }
}

fn print_port_table(proto: &ProtocolRecord) {
    let mut state_w = "state".len();
    let mut service_w = "service".len();
    for p in &proto.ports {
        state_w = state_w.max(p.state.len());
        service_w = service_w.max(p.service.len());
    }
    let port_w = 5usize;

    println!("  Protocol: {}", proto.protocol);
    println!(
        "  {:>port_w$}  {:<state_w$}  {:<service_w$}  version",
        "port",
        "state",
        "service",
        port_w = port_w,
        state_w = state_w,
        service_w = service_w
    );
    println!(
        "  {:-<port_w$}  {:-<state_w$}  {:-<service_w$}  -------",
        "",
        "",
        "",
        port_w = port_w,
        state_w = state_w,
        service_w = service_w
    );
    for p in &proto.ports {
        println!(
            "  {:>port_w$}  {:<state_w$}  {:<service_w$}  {}",
            p.port,
            p.state,
            p.service,
            p.version,
            port_w = port_w,
            state_w = state_w,
            service_w = service_w
        );
    }
}

pub fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No scan history.");
        return;
    }
    let id_w = entries.iter().map(|e| e.id.len()).max().unwrap_or(2).max("id".len());
    let target_w = entries
        .iter()
        .map(|e| e.target.len())
        .max()
        .unwrap_or(6)
        .max("target".len());

    println!("{:<id_w$}  {:<target_w$}  {:>5}  timestamp", "id", "target", "hosts");
    for e in entries {
        println!(
            "{:<id_w$}  {:<target_w$}  {:>5}  {}",
            e.id,
            e.target,
            e.results.hosts().len(),
            e.timestamp
        );
    }
}

pub fn print_view(view: &ActiveView) {
    match view {
        ActiveView::Empty => println!("Nothing selected."),
        ActiveView::Deleted => println!("Scan deleted."),
        ActiveView::Session { target, timestamp, hosts, csv_url, .. } => {
            println!("Scan History Result: {target} at {timestamp}");
            println!("Total {} hosts discovered in this scan.", hosts.len());
            if let Some(url) = csv_url {
                println!("Download Full CSV: {url}");
            }
            if hosts.is_empty() {
                println!("No data found for this scan.");
            } else {
                print_hosts(hosts);
            }
        }
    }
}
