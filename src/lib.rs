//! Station-mode WiFi connection manager
//!
//! [`ConnectionManager`] brings a radio up in station mode, associates with a
//! single configured network, retries link failures against a bounded budget
//! and lets callers block until the session is connected or has failed.

pub mod config;
pub mod error;
pub mod wifi;

pub use error::{DriverError, DriverResult, ManagerError, ManagerResult};
pub use wifi::{
    AuthMode, Connected, ConnectionManager, ConnectionRequest, ConnectionStatus, DriverEvent,
    Phase, ScanResult, StationDriver,
};
