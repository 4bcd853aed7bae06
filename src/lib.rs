//! Library crate for scan-feed-rs: streaming ingestion of a scan event feed
//! and reconciliation of remote scan history.
pub mod client;
pub mod config;
pub mod console;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod event;
pub mod history;
pub mod logging;
pub mod render;
pub mod session;
pub mod stream;
pub mod types;
