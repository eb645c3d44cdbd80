//! Serial port communication module
//!
//! This module provides functionality for:
//! - Opening the Due's serial link with a fixed configuration
//! - Capturing raw serial output into a binary file
//! - The 1200 baud touch used before a bossac upload

pub mod capture;
pub mod port;

pub use capture::CaptureConfig;
pub use port::{ByteSource, PortConfig, SerialConnection};
