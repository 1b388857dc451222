//! In-process station driver with scripted outcomes
//!
//! Each `connect` command consumes the next scripted [`Attempt`] (or the
//! fallback once the script runs out) and reports its result as an event.
//! Events are delivered from a dedicated dispatch thread, one at a time, like
//! a real radio driver's event loop.

use crate::config;
use crate::error::{DriverError, DriverResult};
use crate::wifi::driver::{EventHandler, StationDriver};
use crate::wifi::types::{AuthMode, DriverEvent, ScanResult};
use secrecy::{ExposeSecret, SecretString};
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::debug;

/// Driver status codes, matching the ESP-IDF WiFi error range
const ERR_NOT_STARTED: u32 = 0x3002;
const ERR_NO_SSID: u32 = 0x300A;

/// Result of one scripted association attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Association succeeds and the address is acquired.
    Associate(Option<IpAddr>),
    /// Association fails with the given reason code.
    Disconnect(u32),
    /// The driver never reports back.
    Silent,
}

/// Commands recorded in the driver's journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimOp {
    RegisterHandler,
    Start,
    Configure,
    Connect,
    Stop,
    Scan,
}

#[derive(Debug, Default)]
struct SimState {
    events: Option<UnboundedSender<DriverEvent>>,
    running: bool,
    ssid: Option<String>,
    attempts: VecDeque<Attempt>,
    access_points: Vec<ScanResult>,
    failures: Vec<(SimOp, DriverError)>,
    journal: Vec<SimOp>,
}

/// Scripted [`StationDriver`] for tests and radio-less hosts
#[derive(Debug)]
pub struct SimulatedDriver {
    state: Mutex<SimState>,
    fallback: Attempt,
    event_delay: Duration,
    scan_duration: Duration,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            fallback: Attempt::Associate(Some(IpAddr::V4(Ipv4Addr::new(192, 168, 4, 2)))),
            event_delay: Duration::from_millis(config::SIM_EVENT_DELAY_MS),
            scan_duration: Duration::from_millis(config::SIM_SCAN_DURATION_MS),
        }
    }

    /// A driver whose first `failures` attempts are rejected by the AP.
    pub fn failing(failures: usize, reason: u32) -> Self {
        let driver = Self::new();
        driver.push_attempts(std::iter::repeat_n(Attempt::Disconnect(reason), failures));
        driver
    }

    /// Outcome used once the scripted attempts run out.
    pub fn with_fallback(mut self, fallback: Attempt) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = delay;
        self
    }

    pub fn with_scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    pub fn with_access_points(self, access_points: Vec<ScanResult>) -> Self {
        self.lock().access_points = access_points;
        self
    }

    /// A small neighbourhood of access points for demos.
    pub fn with_demo_access_points(self) -> Self {
        self.with_access_points(vec![
            ScanResult {
                ssid: "workshop".to_string(),
                rssi: -42,
                auth_mode: AuthMode::Wpa2Psk,
            },
            ScanResult {
                ssid: "guest".to_string(),
                rssi: -67,
                auth_mode: AuthMode::Open,
            },
            ScanResult {
                ssid: "upstairs".to_string(),
                rssi: -81,
                auth_mode: AuthMode::Wpa2Wpa3Psk,
            },
        ])
    }

    /// Append attempts to the script.
    pub fn push_attempts(&self, attempts: impl IntoIterator<Item = Attempt>) {
        self.lock().attempts.extend(attempts);
    }

    /// Make the next `op` command fail with `error`. Stacks.
    pub fn fail_next(&self, op: SimOp, error: DriverError) {
        self.lock().failures.push((op, error));
    }

    /// Deliver an event as if the radio had produced it.
    pub fn inject(&self, event: DriverEvent) {
        emit(&self.lock(), event);
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn configured_ssid(&self) -> Option<String> {
        self.lock().ssid.clone()
    }

    /// Every command received so far, in order.
    pub fn journal(&self) -> Vec<SimOp> {
        self.lock().journal.clone()
    }

    pub fn count(&self, op: SimOp) -> usize {
        self.lock().journal.iter().filter(|&&o| o == op).count()
    }

    fn begin(&self, op: SimOp) -> DriverResult<MutexGuard<'_, SimState>> {
        let mut state = self.lock();
        state.journal.push(op);
        if let Some(pos) = state.failures.iter().position(|(o, _)| *o == op) {
            let (_, error) = state.failures.remove(pos);
            debug!(?op, %error, "Simulated command failure");
            return Err(error);
        }
        Ok(state)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn emit(state: &SimState, event: DriverEvent) {
    if let Some(sender) = &state.events {
        let _ = sender.send(event);
    }
}

impl StationDriver for SimulatedDriver {
    fn register_handler(&self, handler: EventHandler) -> DriverResult<()> {
        let mut state = self.begin(SimOp::RegisterHandler)?;
        let (tx, mut rx) = mpsc::unbounded_channel::<DriverEvent>();
        let delay = self.event_delay;

        thread::Builder::new()
            .name("sim-dispatch".to_string())
            .spawn(move || {
                while let Some(event) = rx.blocking_recv() {
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    handler(event);
                }
            })
            .map_err(|e| DriverError::Internal(e.to_string()))?;

        // Replacing the sender ends the previous dispatch thread.
        state.events = Some(tx);
        Ok(())
    }

    fn start_station_mode(&self) -> DriverResult<()> {
        let mut state = self.begin(SimOp::Start)?;
        if !state.running {
            state.running = true;
            emit(&state, DriverEvent::StationStarted);
        }
        Ok(())
    }

    fn configure(&self, ssid: &str, credential: &SecretString) -> DriverResult<()> {
        let mut state = self.begin(SimOp::Configure)?;
        debug!(
            ssid,
            credential_len = credential.expose_secret().len(),
            "Simulated station config"
        );
        state.ssid = Some(ssid.to_string());
        Ok(())
    }

    fn connect(&self) -> DriverResult<()> {
        let mut state = self.begin(SimOp::Connect)?;
        if !state.running {
            return Err(DriverError::ConnectFailed {
                code: ERR_NOT_STARTED,
            });
        }
        if state.ssid.is_none() {
            return Err(DriverError::ConnectFailed { code: ERR_NO_SSID });
        }

        match state.attempts.pop_front().unwrap_or(self.fallback) {
            Attempt::Associate(address) => {
                emit(&state, DriverEvent::AddressAcquired { address });
            }
            Attempt::Disconnect(reason) => {
                emit(&state, DriverEvent::Disconnected { reason });
            }
            Attempt::Silent => {}
        }
        Ok(())
    }

    fn stop_station_mode(&self) -> DriverResult<()> {
        let mut state = self.begin(SimOp::Stop)?;
        state.running = false;
        Ok(())
    }

    fn scan(&self) -> DriverResult<Vec<ScanResult>> {
        {
            let state = self.begin(SimOp::Scan)?;
            if !state.running {
                return Err(DriverError::ScanFailed {
                    code: ERR_NOT_STARTED,
                });
            }
        }

        thread::sleep(self.scan_duration);

        let state = self.lock();
        let access_points = state.access_points.clone();
        emit(
            &state,
            DriverEvent::ScanComplete {
                count: access_points.len(),
            },
        );
        Ok(access_points)
    }
}
