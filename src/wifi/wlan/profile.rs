use crate::error::{DriverError, DriverResult};
use crate::wifi::wlan::handle::WlanHandle;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use secrecy::{ExposeSecret, SecretString};
use std::io::Cursor;
use windows::{
    Win32::{Foundation::ERROR_SUCCESS, NetworkManagement::WiFi::*},
    core::PCWSTR,
};

const PROFILE_NAMESPACE: &str = "http://www.microsoft.com/networking/WLAN/profile/v1";

/// Build a manual-connect profile: WPA2-PSK/AES, or open when `credential` is empty.
pub fn station_profile_xml(ssid: &str, credential: &SecretString) -> DriverResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_profile(&mut writer, ssid, credential)
        .map_err(|e| DriverError::Internal(format!("profile xml: {e}")))?;
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| DriverError::Internal(format!("profile xml: {e}")))
}

fn write_profile<W: std::io::Write>(
    writer: &mut Writer<W>,
    ssid: &str,
    credential: &SecretString,
) -> std::io::Result<()> {
    let key = credential.expose_secret();
    let (auth, cipher) = if key.is_empty() {
        ("open", "none")
    } else {
        ("WPA2PSK", "AES")
    };

    writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    let mut root = BytesStart::new("WLANProfile");
    root.push_attribute(("xmlns", PROFILE_NAMESPACE));
    writer.write_event(Event::Start(root))?;

    write_element(writer, "name", ssid)?;
    open(writer, "SSIDConfig")?;
    open(writer, "SSID")?;
    write_element(writer, "name", ssid)?;
    close(writer, "SSID")?;
    close(writer, "SSIDConfig")?;
    write_element(writer, "connectionType", "ESS")?;
    write_element(writer, "connectionMode", "manual")?;

    open(writer, "MSM")?;
    open(writer, "security")?;
    open(writer, "authEncryption")?;
    write_element(writer, "authentication", auth)?;
    write_element(writer, "encryption", cipher)?;
    write_element(writer, "useOneX", "false")?;
    close(writer, "authEncryption")?;
    if !key.is_empty() {
        open(writer, "sharedKey")?;
        write_element(writer, "keyType", "passPhrase")?;
        write_element(writer, "protected", "false")?;
        write_element(writer, "keyMaterial", key)?;
        close(writer, "sharedKey")?;
    }
    close(writer, "security")?;
    close(writer, "MSM")?;

    close(writer, "WLANProfile")
}

fn open<W: std::io::Write>(writer: &mut Writer<W>, name: &str) -> std::io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))
}

fn close<W: std::io::Write>(writer: &mut Writer<W>, name: &str) -> std::io::Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> std::io::Result<()> {
    open(writer, name)?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    close(writer, name)
}

/// Store `xml` as a per-interface profile, replacing any profile of the same name
pub fn set_profile(handle: &WlanHandle, xml: &str) -> DriverResult<()> {
    let xml_wide: Vec<u16> = xml.encode_utf16().chain(std::iter::once(0)).collect();
    let mut reason_code = 0;
    unsafe {
        let result = WlanSetProfile(
            handle.as_raw(),
            handle.interface(),
            0,
            PCWSTR(xml_wide.as_ptr()),
            None,
            true,
            None,
            &mut reason_code,
        );

        if result != ERROR_SUCCESS.0 {
            return Err(DriverError::ConfigFailed {
                code: result,
                reason: reason_code,
            });
        }
    }
    Ok(())
}
