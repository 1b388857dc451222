/// Typed errors for station driver commands and connection manager operations
use std::time::Duration;
use thiserror::Error;

/// Result type alias for driver commands
pub type DriverResult<T> = Result<T, DriverError>;

/// Result type alias for connection manager operations
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors reported by a station driver while executing a command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Failed to open radio handle (code: {code})")]
    HandleOpenFailed { code: u32 },

    #[error("Failed to enumerate interfaces (code: {code})")]
    InterfaceEnumFailed { code: u32 },

    #[error("No WiFi interface found")]
    NoInterface,

    #[error("Failed to register event handler (code: {code})")]
    HandlerRegistrationFailed { code: u32 },

    #[error("Failed to start station mode (code: {code})")]
    StartFailed { code: u32 },

    #[error("Failed to stop station mode (code: {code})")]
    StopFailed { code: u32 },

    #[error("Failed to apply station config (code: {code}, reason: {reason})")]
    ConfigFailed { code: u32, reason: u32 },

    #[error("Failed to issue connect (code: {code})")]
    ConnectFailed { code: u32 },

    #[error("Failed to scan networks (code: {code})")]
    ScanFailed { code: u32 },

    #[error("Failed to read scan results (code: {code})")]
    ScanResultsFailed { code: u32 },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors surfaced by the connection manager
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Network identifier must not be empty")]
    EmptySsid,

    #[error("Network identifier is {len} bytes, limit is {max}")]
    SsidTooLong { len: usize, max: usize },

    #[error("Credential is {len} bytes, at least {min} required")]
    CredentialTooShort { len: usize, min: usize },

    #[error("Credential is {len} bytes, limit is {max}")]
    CredentialTooLong { len: usize, max: usize },

    #[error("Failed to connect to {ssid} after {attempts} retries (last reason: {})", describe_reason(.last_reason))]
    ConnectFailed {
        ssid: String,
        attempts: u32,
        last_reason: Option<u32>,
    },

    #[error("Timed out after {waited:?} waiting for {ssid}")]
    Timeout { ssid: String, waited: Duration },

    #[error("Connection to {ssid} was cancelled by disconnect")]
    Cancelled { ssid: String },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

fn describe_reason(reason: &Option<u32>) -> String {
    match reason {
        Some(code) => reason_to_string(*code),
        None => "none".to_string(),
    }
}

/// Convert a station disconnect reason code to a human-readable string
///
/// Covers the IEEE 802.11 reason codes a station commonly sees plus the
/// vendor range (200+) reported by ESP-IDF style drivers.
pub fn reason_to_string(code: u32) -> String {
    match code {
        1 => "Unspecified".to_string(),
        2 => "Authentication Expired".to_string(),
        3 => "Deauthenticated (Station Leaving)".to_string(),
        4 => "Disassociated (Inactivity)".to_string(),
        5 => "Disassociated (AP Busy)".to_string(),
        6 => "Class 2 Frame From Unauthenticated Station".to_string(),
        7 => "Class 3 Frame From Unassociated Station".to_string(),
        8 => "Disassociated (Station Leaving)".to_string(),
        9 => "Association Without Authentication".to_string(),
        14 => "MIC Failure".to_string(),
        15 => "4-Way Handshake Timeout (Possible Wrong Password)".to_string(),
        16 => "Group Key Update Timeout".to_string(),
        23 => "802.1X Authentication Failed".to_string(),
        200 => "Beacon Timeout".to_string(),
        201 => "No AP Found".to_string(),
        202 => "Authentication Failed".to_string(),
        203 => "Association Failed".to_string(),
        204 => "Handshake Timeout (Possible Wrong Password)".to_string(),
        205 => "Connection Failed".to_string(),
        206 => "AP TSF Reset".to_string(),
        207 => "Roaming".to_string(),
        208 => "Association Comeback Time Too Long".to_string(),
        209 => "SA Query Timeout".to_string(),
        210 => "No AP Found With Compatible Security".to_string(),
        211 => "No AP Found In Auth Mode Threshold".to_string(),
        _ => format!("Unknown Reason (Code: {code}, 0x{code:X})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_reasons_have_names() {
        assert_eq!(reason_to_string(201), "No AP Found");
        assert_eq!(
            reason_to_string(15),
            "4-Way Handshake Timeout (Possible Wrong Password)"
        );
    }

    #[test]
    fn unknown_reason_shows_code() {
        assert_eq!(reason_to_string(999), "Unknown Reason (Code: 999, 0x3E7)");
    }

    #[test]
    fn connect_failed_message_includes_reason() {
        let err = ManagerError::ConnectFailed {
            ssid: "lab".to_string(),
            attempts: 3,
            last_reason: Some(202),
        };
        assert_eq!(
            err.to_string(),
            "Failed to connect to lab after 3 retries (last reason: Authentication Failed)"
        );

        let err = ManagerError::ConnectFailed {
            ssid: "lab".to_string(),
            attempts: 0,
            last_reason: None,
        };
        assert!(err.to_string().ends_with("(last reason: none)"));
    }
}
