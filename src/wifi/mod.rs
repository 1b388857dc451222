//! Station-mode WiFi connection management
//!
//! This module provides the connection manager state machine, its retry
//! policy and outcome signal, and the station drivers it runs on.

mod driver;
mod manager;
mod retry;
mod signal;
pub mod sim;
mod types;
#[cfg(windows)]
mod wlan;

// Re-export public API
pub use driver::{EventHandler, StationDriver};
pub use manager::ConnectionManager;
pub use retry::RetryPolicy;
pub use signal::{EventBits, OutcomeSignal};
pub use types::{
    AuthMode, Connected, ConnectionRequest, ConnectionStatus, DriverEvent, Phase, ScanResult,
};
#[cfg(windows)]
pub use wlan::WlanDriver;
