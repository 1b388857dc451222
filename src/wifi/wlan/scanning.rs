use crate::config;
use crate::error::{DriverError, DriverResult};
use crate::wifi::types::{AuthMode, ScanResult};
use crate::wifi::wlan::handle::WlanHandle;
use windows::Win32::{Foundation::ERROR_SUCCESS, NetworkManagement::WiFi::*};

/// Trigger a scan, wait for it to settle, then read the visible networks
///
/// WlanScan only queues the scan, so the settle delay stands in for the
/// scan-complete notification.
pub fn scan_blocking(handle: &WlanHandle) -> DriverResult<Vec<ScanResult>> {
    unsafe {
        let result = WlanScan(handle.as_raw(), handle.interface(), None, None, None);
        if result != ERROR_SUCCESS.0 {
            return Err(DriverError::ScanFailed { code: result });
        }
    }

    std::thread::sleep(std::time::Duration::from_millis(config::SCAN_SETTLE_MS));
    available_networks(handle)
}

#[allow(non_upper_case_globals)]
fn available_networks(handle: &WlanHandle) -> DriverResult<Vec<ScanResult>> {
    let mut results = Vec::new();

    unsafe {
        let mut list: *mut WLAN_AVAILABLE_NETWORK_LIST = std::ptr::null_mut();
        let result =
            WlanGetAvailableNetworkList(handle.as_raw(), handle.interface(), 0, None, &mut list);
        if result != ERROR_SUCCESS.0 {
            return Err(DriverError::ScanResultsFailed { code: result });
        }

        let items = std::slice::from_raw_parts(
            (*list).Network.as_ptr(),
            (*list).dwNumberOfItems as usize,
        );

        for item in items {
            let ssid_len = item.dot11Ssid.uSSIDLength as usize;
            if ssid_len == 0 {
                continue;
            }
            let ssid = String::from_utf8_lossy(&item.dot11Ssid.ucSSID[..ssid_len]).to_string();

            let auth_mode = match item.dot11DefaultAuthAlgorithm {
                DOT11_AUTH_ALGO_80211_OPEN => AuthMode::Open,
                DOT11_AUTH_ALGO_80211_SHARED_KEY => AuthMode::Wep,
                DOT11_AUTH_ALGO_WPA_PSK => AuthMode::WpaPsk,
                DOT11_AUTH_ALGO_RSNA_PSK => AuthMode::Wpa2Psk,
                DOT11_AUTH_ALGO_RSNA => AuthMode::Wpa2Enterprise,
                DOT11_AUTH_ALGO_WPA3_SAE => AuthMode::Wpa3Psk,
                _ => AuthMode::Unknown,
            };

            results.push(ScanResult {
                ssid,
                rssi: quality_to_dbm(item.wlanSignalQuality),
                auth_mode,
            });
        }

        WlanFreeMemory(list as *mut _);
    }

    Ok(results)
}

/// WLAN signal quality is linear between -100 dBm (0) and -50 dBm (100).
fn quality_to_dbm(quality: u32) -> i32 {
    (quality.min(100) as i32) / 2 - 100
}
