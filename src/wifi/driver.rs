use crate::error::DriverResult;
use crate::wifi::types::{DriverEvent, ScanResult};
use secrecy::SecretString;
use std::sync::Arc;

/// Callback the driver invokes for every lifecycle event
pub type EventHandler = Arc<dyn Fn(DriverEvent) + Send + Sync>;

/// Abstraction over the radio driver that runs station mode
///
/// Commands return once the driver has accepted them; their effects are
/// reported later through the registered [`EventHandler`]. Implementations
/// must deliver events from their own dispatch thread, one at a time, and
/// never from inside a command call.
pub trait StationDriver: Send + Sync {
    /// Register the handler that receives every subsequent event.
    fn register_handler(&self, handler: EventHandler) -> DriverResult<()>;

    /// Bring the radio up in station mode. Emits `StationStarted`.
    fn start_station_mode(&self) -> DriverResult<()>;

    /// Set the network the next `connect` associates with.
    fn configure(&self, ssid: &str, credential: &SecretString) -> DriverResult<()>;

    /// Attempt association with the configured network.
    ///
    /// Emits `AddressAcquired` on success or `Disconnected` on failure.
    fn connect(&self) -> DriverResult<()>;

    /// Take the radio out of station mode.
    fn stop_station_mode(&self) -> DriverResult<()>;

    /// Run a scan to completion and return the access points in the order
    /// the driver reports them. Requires station mode to be running.
    fn scan(&self) -> DriverResult<Vec<ScanResult>>;
}
