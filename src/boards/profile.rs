//! Board profile definitions
//!
//! Defines the structure for board profiles used by capture and upload.

/// How bossac reaches the board's bootloader
#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// Pass `-U true` to bossac (required on the native USB port)
    pub native_usb: bool,
    /// Baud rate used for the erase/reset touch (None = no touch)
    pub touch_baud: Option<u32>,
    /// Name prefix of the device node the board shows up as
    pub device_prefix: String,
    /// Callout port name prefix bossac expects
    pub port_stem: String,
}

/// Complete board profile
#[derive(Debug, Clone)]
pub struct BoardProfile {
    /// Board name
    pub name: String,
    /// Short identifier (e.g., "due")
    pub id: String,
    /// Board description
    pub description: String,
    /// Microcontroller on the board
    pub mcu: String,
    /// Baud rate the capture firmware logs at
    pub capture_baud: u32,
    /// Upload settings
    pub upload: UploadSettings,
}
