use crate::error::{DriverError, DriverResult};
use crate::wifi::types::DriverEvent;
use crate::wifi::wlan::handle::WlanHandle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use windows::Win32::{Foundation::ERROR_SUCCESS, NetworkManagement::WiFi::*};

/// WLAN_REASON_CODE_SUCCESS
const REASON_SUCCESS: u32 = 0;

/// Registration of the ACM notification callback, undone on drop
#[derive(Debug)]
pub struct AcmListener {
    handle: WlanHandle,
    context: *mut std::ffi::c_void,
}

unsafe impl Send for AcmListener {}
unsafe impl Sync for AcmListener {}

impl Drop for AcmListener {
    fn drop(&mut self) {
        unsafe {
            let _ = WlanRegisterNotification(
                self.handle.as_raw(),
                WLAN_NOTIFICATION_SOURCE_NONE,
                true,
                None,
                None,
                None,
                None,
            );
            let _ = Box::from_raw(self.context as *mut UnboundedSender<DriverEvent>);
        }
    }
}

unsafe extern "system" fn notification_callback(
    data: *mut L2_NOTIFICATION_DATA,
    context: *mut std::ffi::c_void,
) {
    if data.is_null() || context.is_null() {
        return;
    }

    // SAFETY: checked for null above. The context is the boxed sender created
    // in `AcmListener::register` and outlives the registration.
    let (data, sender) = unsafe {
        (
            &*data,
            &*(context as *const UnboundedSender<DriverEvent>),
        )
    };

    if data.NotificationSource != WLAN_NOTIFICATION_SOURCE_ACM {
        return;
    }

    let code = data.NotificationCode;
    if code == wlan_notification_acm_scan_complete.0 as u32 {
        let _ = sender.send(DriverEvent::ScanComplete { count: 0 });
        return;
    }

    let is_connection_event = code == wlan_notification_acm_connection_complete.0 as u32
        || code == wlan_notification_acm_connection_attempt_fail.0 as u32
        || code == wlan_notification_acm_disconnected.0 as u32;
    if !is_connection_event
        || data.dwDataSize < std::mem::size_of::<WLAN_CONNECTION_NOTIFICATION_DATA>() as u32
    {
        return;
    }

    // SAFETY: pData points to WLAN_CONNECTION_NOTIFICATION_DATA for these
    // codes, and the size was checked above.
    let conn_data = unsafe { &*(data.pData as *const WLAN_CONNECTION_NOTIFICATION_DATA) };
    let reason = conn_data.wlanReasonCode;

    // A failed attempt is reported twice (attempt_fail, then connection_complete
    // with the failure reason). Only the latter is forwarded.
    let event = if code == wlan_notification_acm_connection_complete.0 as u32 {
        if reason == REASON_SUCCESS {
            DriverEvent::AddressAcquired { address: None }
        } else {
            DriverEvent::Disconnected { reason }
        }
    } else if code == wlan_notification_acm_disconnected.0 as u32 {
        DriverEvent::Disconnected { reason }
    } else {
        debug!(
            reason,
            reason_str = %wlan_reason_to_string(reason),
            "Connection attempt failed"
        );
        return;
    };
    let _ = sender.send(event);
}

impl AcmListener {
    /// Forward ACM connection and scan notifications into `sender`
    pub fn register(sender: UnboundedSender<DriverEvent>) -> DriverResult<Self> {
        let wlan_handle = WlanHandle::open()?;
        let context = Box::into_raw(Box::new(sender));

        unsafe {
            let result = WlanRegisterNotification(
                wlan_handle.as_raw(),
                WLAN_NOTIFICATION_SOURCE_ACM,
                false,
                Some(notification_callback),
                Some(context as *mut std::ffi::c_void),
                None,
                None,
            );

            if result != ERROR_SUCCESS.0 {
                let _ = Box::from_raw(context);
                return Err(DriverError::HandlerRegistrationFailed { code: result });
            }
        }

        Ok(Self {
            handle: wlan_handle,
            context: context as *mut std::ffi::c_void,
        })
    }
}

/// Convert a WLAN reason code to a human-readable string
pub fn wlan_reason_to_string(code: u32) -> String {
    match code {
        0 => "Success".to_string(),
        1 => "Unknown Failure".to_string(),
        0x00010001 => "Network Not Compatible".to_string(),
        0x00010002 => "Profile Not Compatible".to_string(),
        0x00028002 => "Association Failed".to_string(),
        0x00028003 => "Association Timeout".to_string(),
        0x00028006 => "Security Failure".to_string(),
        0x00028007 => "Security Timeout".to_string(),
        0x0002800B => "Driver Disconnected (Possible Wrong Password)".to_string(),
        0x00038002 => "Connection Failed (Network Not Available or Wrong Password)".to_string(),
        0x00038003 => "Profile Not Found".to_string(),
        0x00050004 => "Incorrect Password".to_string(),
        0x00048014 => "Authentication Timeout (Possible Wrong Password)".to_string(),
        _ => format!("Unknown Error (Code: {code}, 0x{code:X})"),
    }
}
