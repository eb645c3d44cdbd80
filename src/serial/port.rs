//! Serial port configuration and connection management
//!
//! Opens the USB serial link to the Due and exposes the small surface the
//! capture loop and the uploader need.

use anyhow::{Context, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read};
use std::time::Duration;

/// Baud rate the capture firmware logs at
pub const DEFAULT_CAPTURE_BAUD: u32 = 230400;

/// Opening the Due's USB port at this rate triggers erase + SAM-BA reset
pub const TOUCH_BAUD: u32 = 1200;

/// Default device path for the FTDI adapter used for capture
pub const DEFAULT_CAPTURE_PORT: &str = "/dev/cu.usbserial-FT611XTT3";

/// Configuration for serial port connection
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// Serial port path (e.g., /dev/cu.usbserial-FT611XTT3, /dev/ttyACM0)
    pub port_path: String,
    /// Baud rate (default: 230400)
    pub baud_rate: u32,
    /// Data bits (default: 8)
    pub data_bits: DataBits,
    /// Parity (default: None)
    pub parity: Parity,
    /// Stop bits (default: 1)
    pub stop_bits: StopBits,
    /// Flow control (default: None)
    pub flow_control: FlowControl,
    /// Upper bound on how long a read blocks waiting for the first byte
    pub timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_path: String::from(DEFAULT_CAPTURE_PORT),
            baud_rate: DEFAULT_CAPTURE_BAUD,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            timeout: Duration::from_millis(100),
        }
    }
}

impl PortConfig {
    /// Create a new configuration with default 8N1 settings
    pub fn new(port_path: &str) -> Self {
        Self {
            port_path: port_path.to_string(),
            ..Default::default()
        }
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Anything the capture loop can drain bytes from.
pub trait ByteSource {
    /// Number of bytes already buffered and readable without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read into `buf`, blocking until at least one byte arrives or the
    /// source's wait period elapses (`ErrorKind::TimedOut`).
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Open serial link; the OS handle is closed when this is dropped
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    config: PortConfig,
}

impl SerialConnection {
    /// Open a serial connection with the given configuration
    pub fn open(config: PortConfig) -> Result<Self> {
        let port = serialport::new(&config.port_path, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control)
            .timeout(config.timeout)
            .open()
            .with_context(|| format!("Failed to open serial port: {}", config.port_path))?;

        log::debug!(
            "opened {} at {} baud (timeout {:?})",
            config.port_path,
            config.baud_rate,
            config.timeout
        );

        Ok(Self { port, config })
    }

    /// Get the port configuration
    pub fn config(&self) -> &PortConfig {
        &self.config
    }
}

impl ByteSource for SerialConnection {
    fn bytes_available(&mut self) -> io::Result<usize> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Drop for SerialConnection {
    fn drop(&mut self) {
        log::debug!("released serial port {}", self.config.port_path);
    }
}

/// Open `port_path` at the 1200 baud "touch" rate and close it again.
///
/// On the Due this asks the ATmega16U2 / native USB stack to erase flash and
/// reboot into the SAM-BA bootloader so bossac can talk to it.
pub fn touch(port_path: &str, baud_rate: u32) -> Result<()> {
    let config = PortConfig::new(port_path)
        .with_baud_rate(baud_rate)
        .with_timeout(Duration::from_millis(100));
    let conn = SerialConnection::open(config)
        .with_context(|| format!("Failed to touch {} at {} baud", port_path, baud_rate))?;
    drop(conn);
    Ok(())
}
