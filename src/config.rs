/// Centralized configuration constants for stationctl

// Station config limits (802.11 SSID and WPA passphrase/PSK bounds)
pub const SSID_MAX_LEN: usize = 32;
pub const CREDENTIAL_MIN_LEN: usize = 8;
pub const CREDENTIAL_MAX_LEN: usize = 64;

// Retry policy
pub const DEFAULT_MAX_RETRY: u32 = 5;

// Timing
pub const STATUS_POLL_INTERVAL_SECS: u64 = 10;
pub const SIM_EVENT_DELAY_MS: u64 = 50;
pub const SIM_SCAN_DURATION_MS: u64 = 200;
#[cfg(windows)]
pub const PROFILE_REGISTRATION_DELAY_MS: u64 = 1500;
#[cfg(windows)]
pub const SCAN_SETTLE_MS: u64 = 4000;

// Environment overrides for the CLI
pub const ENV_SSID: &str = "STATIONCTL_SSID";
pub const ENV_PASSWORD: &str = "STATIONCTL_PASSWORD";
