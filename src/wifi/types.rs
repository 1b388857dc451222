use crate::config;
use crate::error::{ManagerError, ManagerResult};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Target network for one connection session
///
/// Built through [`ConnectionRequest::new`], which enforces the identifier and
/// credential bounds. Fields are read-only afterwards.
#[derive(Debug, Clone)]
pub struct ConnectionRequest {
    ssid: String,
    credential: SecretString,
    max_retry: u32,
    timeout: Option<Duration>,
}

impl ConnectionRequest {
    /// An empty credential selects an open network.
    pub fn new(
        ssid: impl Into<String>,
        credential: SecretString,
        max_retry: u32,
    ) -> ManagerResult<Self> {
        let ssid = ssid.into();
        if ssid.is_empty() {
            return Err(ManagerError::EmptySsid);
        }
        if ssid.len() > config::SSID_MAX_LEN {
            return Err(ManagerError::SsidTooLong {
                len: ssid.len(),
                max: config::SSID_MAX_LEN,
            });
        }

        let len = credential.expose_secret().len();
        if len > config::CREDENTIAL_MAX_LEN {
            return Err(ManagerError::CredentialTooLong {
                len,
                max: config::CREDENTIAL_MAX_LEN,
            });
        }
        if len > 0 && len < config::CREDENTIAL_MIN_LEN {
            return Err(ManagerError::CredentialTooShort {
                len,
                min: config::CREDENTIAL_MIN_LEN,
            });
        }

        Ok(Self {
            ssid,
            credential,
            max_retry,
            timeout: None,
        })
    }

    /// Bound the wait in `connect`. Without this the wait is unbounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_open(&self) -> bool {
        self.credential.expose_secret().is_empty()
    }
}

/// Authentication mode advertised by an access point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Wpa3Psk,
    Wpa2Wpa3Psk,
    WapiPsk,
    #[default]
    Unknown,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthMode::Open => "Open",
            AuthMode::Wep => "WEP",
            AuthMode::WpaPsk => "WPA-PSK",
            AuthMode::Wpa2Psk => "WPA2-PSK",
            AuthMode::WpaWpa2Psk => "WPA/WPA2-PSK",
            AuthMode::Wpa2Enterprise => "WPA2-Enterprise",
            AuthMode::Wpa3Psk => "WPA3-SAE",
            AuthMode::Wpa2Wpa3Psk => "WPA2/WPA3-PSK",
            AuthMode::WapiPsk => "WAPI-PSK",
            AuthMode::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One access point reported by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub ssid: String,
    /// Signal strength in dBm
    pub rssi: i32,
    pub auth_mode: AuthMode,
}

/// Asynchronous notifications delivered by a station driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    StationStarted,
    Disconnected { reason: u32 },
    AddressAcquired { address: Option<IpAddr> },
    ScanComplete { count: usize },
}

/// Successful outcome of a connect session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connected {
    pub ssid: String,
    pub address: Option<IpAddr>,
}

/// Where the manager currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Connecting,
    Connected,
    Failed,
    Scanning,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Connecting => "connecting",
            Phase::Connected => "connected",
            Phase::Failed => "failed",
            Phase::Scanning => "scanning",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of the manager, see `ConnectionManager::status`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    pub phase: Phase,
    pub ssid: Option<String>,
    pub retry_count: u32,
    pub max_retry: u32,
    pub address: Option<IpAddr>,
}
