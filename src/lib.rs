//! Library crate for scan-dash-rs exposing reusable modules.
pub mod config;
pub mod dashboard;
pub mod events;
pub mod latency;
pub mod render;
pub mod replay;
pub mod scan;
pub mod server;
pub mod socketio;
pub mod sysinfo;
pub mod transport;
pub mod types;
