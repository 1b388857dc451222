//! Station driver backed by the Win32 WLAN API
//!
//! Windows keeps the wireless interface in station mode permanently, so
//! starting and stopping station mode only gate whether the manager is
//! allowed to associate. ACM notifications are translated into
//! [`DriverEvent`]s and dispatched from a dedicated thread.

mod handle;
mod listener;
mod profile;
mod scanning;

use crate::config;
use crate::error::{DriverError, DriverResult};
use crate::wifi::driver::{EventHandler, StationDriver};
use crate::wifi::types::{DriverEvent, ScanResult};
use handle::WlanHandle;
use listener::AcmListener;
use secrecy::SecretString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};
use windows::{
    Win32::{Foundation::ERROR_SUCCESS, NetworkManagement::WiFi::*},
    core::PCWSTR,
};

/// Win32 ERROR_INVALID_STATE
const ERROR_INVALID_STATE: u32 = 5023;

#[derive(Debug)]
pub struct WlanDriver {
    handle: WlanHandle,
    events: UnboundedSender<DriverEvent>,
    pending: Mutex<Option<UnboundedReceiver<DriverEvent>>>,
    listener: Mutex<Option<AcmListener>>,
    profile: Mutex<Option<String>>,
    running: AtomicBool,
}

impl WlanDriver {
    /// Open the first wireless interface
    pub fn open() -> DriverResult<Self> {
        let handle = WlanHandle::open()?;
        let (events, pending) = mpsc::unbounded_channel();
        info!(interface = ?handle.interface(), "Opened WLAN interface");
        Ok(Self {
            handle,
            events,
            pending: Mutex::new(Some(pending)),
            listener: Mutex::new(None),
            profile: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StationDriver for WlanDriver {
    fn register_handler(&self, handler: EventHandler) -> DriverResult<()> {
        let Some(mut pending) = lock(&self.pending).take() else {
            return Err(DriverError::Internal(
                "event handler already registered".to_string(),
            ));
        };

        *lock(&self.listener) = Some(AcmListener::register(self.events.clone())?);

        thread::Builder::new()
            .name("wlan-dispatch".to_string())
            .spawn(move || {
                while let Some(event) = pending.blocking_recv() {
                    handler(event);
                }
            })
            .map_err(|e| DriverError::Internal(e.to_string()))?;
        Ok(())
    }

    fn start_station_mode(&self) -> DriverResult<()> {
        if !self.running.swap(true, Ordering::SeqCst) {
            let _ = self.events.send(DriverEvent::StationStarted);
        }
        Ok(())
    }

    fn configure(&self, ssid: &str, credential: &SecretString) -> DriverResult<()> {
        let xml = profile::station_profile_xml(ssid, credential)?;
        profile::set_profile(&self.handle, &xml)?;

        // Give the system a moment to register the profile
        thread::sleep(std::time::Duration::from_millis(
            config::PROFILE_REGISTRATION_DELAY_MS,
        ));
        debug!(ssid, "Profile stored");
        *lock(&self.profile) = Some(ssid.to_string());
        Ok(())
    }

    fn connect(&self) -> DriverResult<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(DriverError::ConnectFailed {
                code: ERROR_INVALID_STATE,
            });
        }
        let Some(profile_name) = lock(&self.profile).clone() else {
            return Err(DriverError::ConnectFailed {
                code: ERROR_INVALID_STATE,
            });
        };

        let profile_wide: Vec<u16> = profile_name
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();
        unsafe {
            let params = WLAN_CONNECTION_PARAMETERS {
                wlanConnectionMode: wlan_connection_mode_profile,
                strProfile: PCWSTR(profile_wide.as_ptr()),
                pDot11Ssid: std::ptr::null_mut(),
                pDesiredBssidList: std::ptr::null_mut(),
                dot11BssType: dot11_BSS_type_infrastructure,
                dwFlags: 0,
            };

            let result = WlanConnect(self.handle.as_raw(), self.handle.interface(), &params, None);
            if result != ERROR_SUCCESS.0 {
                return Err(DriverError::ConnectFailed { code: result });
            }
        }
        Ok(())
    }

    fn stop_station_mode(&self) -> DriverResult<()> {
        self.running.store(false, Ordering::SeqCst);
        unsafe {
            let result = WlanDisconnect(self.handle.as_raw(), self.handle.interface(), None);
            if result != ERROR_SUCCESS.0 {
                return Err(DriverError::StopFailed { code: result });
            }
        }
        Ok(())
    }

    fn scan(&self) -> DriverResult<Vec<ScanResult>> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(DriverError::ScanFailed {
                code: ERROR_INVALID_STATE,
            });
        }
        scanning::scan_blocking(&self.handle)
    }
}
