//! Firmware upload through bossac
//!
//! This module provides functionality for:
//! - Finding the Due's USB device node by name
//! - Rebuilding the callout port name bossac expects
//! - The 1200 baud touch and the bossac invocation itself

pub mod bossac;
pub mod discover;

pub use bossac::{upload, UploadConfig};
pub use discover::{find_devices, resolve_port};

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("firmware image not found: {}", .0.display())]
    FirmwareMissing(PathBuf),

    #[error("no serial device matching {prefix}* in {}", dir.display())]
    NoPortFound { dir: PathBuf, prefix: String },

    #[error("could not find a port number in {}", .0.display())]
    NoPortNumber(PathBuf),

    #[error("failed to scan device directory {}", path.display())]
    DeviceDir {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to run {}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bossac exited with {status}")]
    Failed { status: ExitStatus },
}
