use crate::error::{ManagerError, ManagerResult, reason_to_string};
use crate::wifi::driver::{EventHandler, StationDriver};
use crate::wifi::retry::RetryPolicy;
use crate::wifi::signal::{EventBits, OutcomeSignal};
use crate::wifi::types::{
    Connected, ConnectionRequest, ConnectionStatus, DriverEvent, Phase, ScanResult,
};
use secrecy::ExposeSecret;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Station-mode connection manager
///
/// Owns the retry budget and the outcome bits of the current session and
/// reacts to events from a [`StationDriver`]. `connect` and `scan_networks`
/// both take the radio, so concurrent calls run one after the other.
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    driver: Arc<dyn StationDriver>,
    signal: OutcomeSignal,
    session: Mutex<Session>,
    radio: Mutex<()>,
}

#[derive(Debug, Default)]
struct Session {
    phase: Phase,
    ssid: Option<String>,
    retry: RetryPolicy,
    station_running: bool,
    address: Option<IpAddr>,
    last_reason: Option<u32>,
    cancelled: bool,
}

impl ConnectionManager {
    /// Create the manager and register its event handler with `driver`.
    pub fn init<D>(driver: Arc<D>) -> ManagerResult<Self>
    where
        D: StationDriver + 'static,
    {
        let inner = Arc::new(Inner {
            driver,
            signal: OutcomeSignal::new(),
            session: Mutex::new(Session::default()),
            radio: Mutex::new(()),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let handler: EventHandler = Arc::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_event(event);
            }
        });
        inner.driver.register_handler(handler)?;

        debug!("Connection manager initialized");
        Ok(Self { inner })
    }

    /// Run one connect session and block until it ends.
    ///
    /// Waits for the session's terminal outcome, or until the request's
    /// timeout elapses when one is set.
    pub fn connect(&self, request: &ConnectionRequest) -> ManagerResult<Connected> {
        let _radio = self.inner.lock_radio();
        let ssid = request.ssid().to_string();

        let station_running = {
            let mut session = self.inner.lock_session();
            session.phase = Phase::Connecting;
            session.ssid = Some(ssid.clone());
            session.retry.reset(request.max_retry());
            session.address = None;
            session.last_reason = None;
            session.cancelled = false;
            self.inner
                .signal
                .clear(EventBits::CONNECTED | EventBits::FAILED);
            session.station_running
        };

        info!(
            ssid = %ssid,
            credential_len = request.credential().expose_secret().len(),
            open = request.is_open(),
            max_retry = request.max_retry(),
            "Connecting to WiFi"
        );

        if let Err(err) = self.start_session(request, station_running) {
            self.inner.abandon_session();
            return Err(err);
        }

        self.inner
            .signal
            .wait_any(EventBits::CONNECTED | EventBits::FAILED, request.timeout());
        self.inner.conclude(ssid, request.timeout())
    }

    fn start_session(
        &self,
        request: &ConnectionRequest,
        station_running: bool,
    ) -> ManagerResult<()> {
        let driver = &self.inner.driver;
        driver.configure(request.ssid(), request.credential())?;

        if station_running {
            // No StationStarted will follow, associate straight away.
            self.inner.associate();
        } else {
            driver.start_station_mode()?;
            let cancelled = {
                let mut session = self.inner.lock_session();
                session.station_running = !session.cancelled;
                session.cancelled
            };
            if cancelled {
                // disconnect() ran before the station came up.
                driver.stop_station_mode()?;
            }
        }
        Ok(())
    }

    /// True when the current session has reached CONNECTED. Never blocks.
    pub fn is_connected(&self) -> bool {
        self.inner.signal.get_all().contains(EventBits::CONNECTED)
    }

    /// Take the radio out of station mode.
    ///
    /// A session still connecting ends with FAILED and its `connect` returns
    /// [`ManagerError::Cancelled`]. Otherwise the outcome bits are left as
    /// they are until the next `connect`.
    pub fn disconnect(&self) -> ManagerResult<()> {
        {
            let mut session = self.inner.lock_session();
            if session.phase == Phase::Connecting
                && !self.inner.signal.get_all().contains(EventBits::CONNECTED)
            {
                session.cancelled = true;
                self.inner.signal.set(EventBits::FAILED);
                info!("Connect session cancelled");
            }
            session.phase = Phase::Idle;
        }
        self.inner.driver.stop_station_mode()?;
        self.inner.lock_session().station_running = false;
        info!("WiFi station stopped");
        Ok(())
    }

    /// Scan for access points, leaving station mode stopped afterwards.
    ///
    /// Results keep the order the driver reported them in.
    pub fn scan_networks(&self) -> ManagerResult<Vec<ScanResult>> {
        let _radio = self.inner.lock_radio();
        let station_running = {
            let mut session = self.inner.lock_session();
            session.phase = Phase::Scanning;
            session.station_running
        };

        info!("Starting WiFi scan");
        let driver = &self.inner.driver;
        if !station_running {
            if let Err(err) = driver.start_station_mode() {
                self.inner.lock_session().phase = Phase::Idle;
                return Err(err.into());
            }
        }

        let scanned = driver.scan();
        let stopped = driver.stop_station_mode();
        {
            let mut session = self.inner.lock_session();
            session.phase = Phase::Idle;
            session.station_running = stopped.is_err();
        }

        let access_points = scanned?;
        stopped?;

        info!(count = access_points.len(), "Found access points");
        for (index, ap) in access_points.iter().enumerate() {
            info!(
                index,
                ssid = %ap.ssid,
                rssi = ap.rssi,
                auth = %ap.auth_mode,
                "Access point"
            );
        }
        Ok(access_points)
    }

    /// Snapshot of the manager's state.
    pub fn status(&self) -> ConnectionStatus {
        let session = self.inner.lock_session();
        ConnectionStatus {
            phase: session.phase,
            ssid: session.ssid.clone(),
            retry_count: session.retry.retry_count(),
            max_retry: session.retry.max_retry(),
            address: session.address,
        }
    }
}

impl Inner {
    fn handle_event(&self, event: DriverEvent) {
        match event {
            DriverEvent::StationStarted => {
                let session = self.lock_session();
                if session.phase != Phase::Connecting {
                    debug!(phase = %session.phase, "Station started outside a connect session");
                    return;
                }
                drop(session);
                debug!("Station started, associating");
                self.associate();
            }
            DriverEvent::Disconnected { reason } => {
                if self.on_link_lost(Some(reason)) {
                    self.associate();
                }
            }
            DriverEvent::AddressAcquired { address } => {
                let mut session = self.lock_session();
                if !matches!(session.phase, Phase::Connecting | Phase::Connected) {
                    debug!(phase = %session.phase, "Ignoring address outside a connect session");
                    return;
                }
                session.retry.record_success();
                session.phase = Phase::Connected;
                session.address = address;
                match address {
                    Some(address) => info!(%address, "Got IP address"),
                    None => info!("Link up"),
                }
                self.signal.set(EventBits::CONNECTED);
            }
            DriverEvent::ScanComplete { count } => {
                debug!(count, "Scan complete");
            }
        }
    }

    /// Issue the connect command, charging rejected commands to the retry budget.
    fn associate(&self) {
        loop {
            let Err(err) = self.driver.connect() else {
                return;
            };
            warn!(error = %err, "Connect command rejected");
            if !self.on_link_lost(None) {
                return;
            }
        }
    }

    /// Apply the retry policy to a lost or refused link.
    ///
    /// Returns true when another association attempt should be made.
    fn on_link_lost(&self, reason: Option<u32>) -> bool {
        let mut session = self.lock_session();
        if let Some(reason) = reason {
            info!(
                reason,
                reason_str = %reason_to_string(reason),
                "WiFi disconnected"
            );
        }
        if !matches!(session.phase, Phase::Connecting | Phase::Connected) {
            debug!(phase = %session.phase, "Not reconnecting outside a connect session");
            return false;
        }
        if reason.is_some() {
            session.last_reason = reason;
        }

        if session.retry.should_retry() {
            session.retry.record_failure();
            session.phase = Phase::Connecting;
            info!(
                "Retrying WiFi connection {}/{}",
                session.retry.retry_count(),
                session.retry.max_retry()
            );
            return true;
        }

        session.phase = Phase::Failed;
        error!(
            "WiFi connection failed after {} retries",
            session.retry.max_retry()
        );
        // A session that already reached CONNECTED keeps that as its outcome.
        if !self.signal.get_all().contains(EventBits::CONNECTED) {
            self.signal.set(EventBits::FAILED);
        }
        false
    }

    /// Turn the session's outcome bits into the result of `connect`.
    ///
    /// Bits are read under the session lock so an outcome that lands after
    /// the wait timed out still wins over the timeout.
    fn conclude(&self, ssid: String, timeout: Option<Duration>) -> ManagerResult<Connected> {
        let mut session = self.lock_session();
        let bits = self.signal.get_all();
        if bits.contains(EventBits::CONNECTED) {
            info!(ssid = %ssid, "WiFi connected");
            return Ok(Connected {
                ssid,
                address: session.address,
            });
        }
        if bits.contains(EventBits::FAILED) {
            if session.cancelled {
                return Err(ManagerError::Cancelled { ssid });
            }
            return Err(ManagerError::ConnectFailed {
                ssid,
                attempts: session.retry.retry_count(),
                last_reason: session.last_reason,
            });
        }

        if session.phase == Phase::Connecting {
            session.phase = Phase::Idle;
        }
        drop(session);
        let waited = timeout.unwrap_or_default();
        warn!(ssid = %ssid, ?waited, "Gave up waiting for connection");
        Err(ManagerError::Timeout { ssid, waited })
    }

    fn abandon_session(&self) {
        let mut session = self.lock_session();
        if session.phase == Phase::Connecting {
            session.phase = Phase::Idle;
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_radio(&self) -> MutexGuard<'_, ()> {
        self.radio.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
