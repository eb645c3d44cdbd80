//! bossac invocation
//!
//! Uploads a prebuilt image without rebuilding the project: find the port,
//! kick the board into SAM-BA with the 1200 baud touch, then run bossac.

use super::{resolve_port, UploadError};
use crate::serial::port::{self, TOUCH_BAUD};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Firmware image PlatformIO leaves behind for the `due` environment
pub const DEFAULT_FIRMWARE: &str = ".pio/build/due/firmware.bin";

/// bossac as installed by the Arduino IDE's SAM core
pub const DEFAULT_BOSSAC: &str = "~/Library/Arduino15/packages/arduino/tools/bossac/1.6.1-arduino/bossac";

/// Everything needed for one upload
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Image to write
    pub firmware: PathBuf,
    /// bossac executable
    pub bossac: PathBuf,
    /// Port name handed to bossac; discovered when None
    pub port: Option<String>,
    /// Directory scanned for device nodes
    pub device_dir: PathBuf,
    /// Device node name prefix
    pub device_prefix: String,
    /// Callout name stem the port number is appended to
    pub port_stem: String,
    /// `-U true` for the native USB port
    pub native_usb: bool,
    /// Touch baud rate (None = skip the touch)
    pub touch_baud: Option<u32>,
    /// Pause between the touch and bossac
    pub settle: Duration,
    /// `-e`
    pub erase: bool,
    /// `-v`
    pub verify: bool,
    /// `-b`
    pub boot_from_flash: bool,
    /// Appended after the standard flags
    pub extra_args: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            firmware: PathBuf::from(DEFAULT_FIRMWARE),
            bossac: PathBuf::from(DEFAULT_BOSSAC),
            port: None,
            device_dir: PathBuf::from("/dev"),
            device_prefix: "tty.usb".to_string(),
            port_stem: "cu.usbmodem".to_string(),
            native_usb: true,
            touch_baud: Some(TOUCH_BAUD),
            settle: Duration::from_millis(500),
            erase: true,
            verify: true,
            boot_from_flash: true,
            extra_args: Vec::new(),
        }
    }
}

/// bossac arguments for writing `config.firmware` through `port`
pub fn bossac_args(config: &UploadConfig, port: &str) -> Vec<String> {
    let mut args = vec![
        "-i".to_string(),
        "-d".to_string(),
        format!("--port={}", port),
        "-U".to_string(),
        config.native_usb.to_string(),
    ];

    if config.erase {
        args.push("-e".to_string());
    }
    args.push("-w".to_string());
    if config.verify {
        args.push("-v".to_string());
    }
    if config.boot_from_flash {
        args.push("-b".to_string());
    }
    args.extend(config.extra_args.iter().cloned());
    args.push(config.firmware.display().to_string());

    args
}

/// Run bossac with inherited stdio and fail on a non-zero exit
pub fn run_bossac(program: &Path, args: &[String]) -> Result<(), UploadError> {
    log::debug!("running {} {}", program.display(), args.join(" "));

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| UploadError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(UploadError::Failed { status })
    }
}

/// Upload `config.firmware`; with `dry_run` only print what would run
pub fn upload(config: &UploadConfig, dry_run: bool) -> Result<()> {
    if !config.firmware.is_file() {
        return Err(UploadError::FirmwareMissing(config.firmware.clone()).into());
    }

    let port_name = resolve_port(config)?;
    println!(
        "{} Using port: {}",
        "[*]".cyan().bold(),
        port_name.white().bold()
    );

    let args = bossac_args(config, &port_name);

    if dry_run {
        println!(
            "{} {} {}",
            "[DRY RUN]".yellow().bold(),
            config.bossac.display(),
            args.join(" ")
        );
        return Ok(());
    }

    if let Some(baud) = config.touch_baud {
        let device = config.device_dir.join(&port_name);
        let device = device.to_string_lossy();
        println!(
            "{} Touching {} at {} baud",
            "[*]".cyan().bold(),
            device.white(),
            baud
        );
        port::touch(&device, baud).context("Failed to reset board into bootloader")?;
        std::thread::sleep(config.settle);
    }

    println!(
        "{} Uploading {}",
        "[TX]".cyan().bold(),
        config.firmware.display().to_string().white()
    );
    run_bossac(&config.bossac, &args)?;

    println!("{}", "[OK] Upload complete".green());
    Ok(())
}
