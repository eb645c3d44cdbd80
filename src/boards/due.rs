//! Arduino Due board profiles
//!
//! The Due exposes two USB ports: the native port driven by the SAM3X8E
//! itself and the programming port behind the ATmega16U2. Both need the
//! 1200 baud touch to reach SAM-BA; only the native one needs `-U true`.

use super::profile::{BoardProfile, UploadSettings};
use crate::serial::port::{DEFAULT_CAPTURE_BAUD, TOUCH_BAUD};
use once_cell::sync::Lazy;

/// Due on its native USB port
pub static DUE_NATIVE_PROFILE: Lazy<BoardProfile> = Lazy::new(|| BoardProfile {
    name: "Arduino Due (native USB)".to_string(),
    id: "due".to_string(),
    description: "SAM3X8E uploaded through the native USB port".to_string(),
    mcu: "sam3x8e".to_string(),
    capture_baud: DEFAULT_CAPTURE_BAUD,
    upload: UploadSettings {
        native_usb: true,
        touch_baud: Some(TOUCH_BAUD),
        device_prefix: "tty.usb".to_string(),
        port_stem: "cu.usbmodem".to_string(),
    },
});

/// Due on its programming port
pub static DUE_PROGRAMMING_PROFILE: Lazy<BoardProfile> = Lazy::new(|| BoardProfile {
    name: "Arduino Due (programming port)".to_string(),
    id: "due-programming".to_string(),
    description: "SAM3X8E uploaded through the ATmega16U2 programming port".to_string(),
    mcu: "sam3x8e".to_string(),
    capture_baud: DEFAULT_CAPTURE_BAUD,
    upload: UploadSettings {
        native_usb: false,
        touch_baud: Some(TOUCH_BAUD),
        device_prefix: "tty.usb".to_string(),
        port_stem: "cu.usbmodem".to_string(),
    },
});
