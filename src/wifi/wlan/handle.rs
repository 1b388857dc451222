use crate::error::{DriverError, DriverResult};
use windows::{
    Win32::{
        Foundation::{ERROR_SUCCESS, HANDLE},
        NetworkManagement::WiFi::*,
    },
    core::GUID,
};

/// WLAN client version 2 (Vista and later)
const WLAN_CLIENT_VERSION: u32 = 2;

/// WLAN client handle bound to the first wireless interface, closed on drop
#[derive(Debug)]
pub struct WlanHandle {
    handle: HANDLE,
    interface: GUID,
}

// WLAN client handles may be used from any thread.
unsafe impl Send for WlanHandle {}
unsafe impl Sync for WlanHandle {}

impl WlanHandle {
    /// Open a client handle and pick the first wireless interface
    pub fn open() -> DriverResult<Self> {
        let mut negotiated_version = 0;
        let mut handle = HANDLE::default();
        unsafe {
            let result = WlanOpenHandle(
                WLAN_CLIENT_VERSION,
                None,
                &mut negotiated_version,
                &mut handle,
            );
            if result != ERROR_SUCCESS.0 {
                return Err(DriverError::HandleOpenFailed { code: result });
            }
        }

        match first_interface(handle) {
            Ok(interface) => Ok(Self { handle, interface }),
            Err(err) => {
                unsafe {
                    let _ = WlanCloseHandle(handle, None);
                }
                Err(err)
            }
        }
    }

    pub fn as_raw(&self) -> HANDLE {
        self.handle
    }

    pub fn interface(&self) -> &GUID {
        &self.interface
    }
}

fn first_interface(handle: HANDLE) -> DriverResult<GUID> {
    unsafe {
        let mut interface_list: *mut WLAN_INTERFACE_INFO_LIST = std::ptr::null_mut();
        let result = WlanEnumInterfaces(handle, None, &mut interface_list);
        if result != ERROR_SUCCESS.0 {
            return Err(DriverError::InterfaceEnumFailed { code: result });
        }

        if (*interface_list).dwNumberOfItems == 0 {
            WlanFreeMemory(interface_list as *mut _);
            return Err(DriverError::NoInterface);
        }

        let guid = (*interface_list).InterfaceInfo[0].InterfaceGuid;
        WlanFreeMemory(interface_list as *mut _);
        Ok(guid)
    }
}

impl Drop for WlanHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = WlanCloseHandle(self.handle, None);
        }
    }
}
