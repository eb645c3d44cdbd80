//! Raw serial capture to a binary file
//!
//! Drains whatever the port has buffered, appends it to the output file and
//! flushes after every chunk, so a killed process leaves a file that is
//! valid up to the last chunk written. Runs until Ctrl+C.

use crate::serial::{ByteSource, PortConfig, SerialConnection};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Largest single read handed to the port
pub const CHUNK_SIZE: usize = 4096;

/// Fatal conditions that end a capture session.
///
/// A user interrupt is not one of them: it ends the session with `Ok`.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to create output file {}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serial read failed")]
    Read(#[source] io::Error),

    #[error("failed to write captured bytes")]
    Write(#[source] io::Error),

    #[error("failed to flush captured bytes")]
    Flush(#[source] io::Error),
}

/// Settings for one capture run
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub port_config: PortConfig,
    pub output: PathBuf,
}

/// What a finished session moved
#[derive(Debug, Clone)]
pub struct CaptureStats {
    pub started: DateTime<Local>,
    pub elapsed: Duration,
    pub chunks: u64,
    pub bytes: u64,
}

/// One capture session: owns the source for its whole lifetime.
///
/// `run` consumes the session, so the source (and with it the serial
/// handle) is dropped on every way out of the loop.
pub struct CaptureSession<S: ByteSource, W: Write> {
    source: S,
    sink: W,
    buffer: Vec<u8>,
}

impl<S: ByteSource> CaptureSession<S, File> {
    /// Truncate/create `output` and attach it to `source`.
    ///
    /// The file is written unbuffered: each chunk goes to the OS in one
    /// `write_all` and nothing is left behind in user space if it fails.
    /// Nothing is read from `source` here; on failure it is dropped before
    /// the error is returned.
    pub fn create(source: S, output: &Path) -> Result<Self, CaptureError> {
        let file = File::create(output).map_err(|source| CaptureError::Output {
            path: output.to_path_buf(),
            source,
        })?;
        Ok(Self::new(source, file))
    }
}

impl<S: ByteSource, W: Write> CaptureSession<S, W> {
    pub fn new(source: S, sink: W) -> Self {
        Self {
            source,
            sink,
            buffer: vec![0u8; CHUNK_SIZE],
        }
    }

    /// Copy bytes from source to sink until `running` goes false.
    pub fn run(mut self, running: &AtomicBool) -> Result<CaptureStats, CaptureError> {
        let started = Local::now();
        let clock = Instant::now();
        let mut chunks = 0u64;
        let mut bytes = 0u64;

        while running.load(Ordering::SeqCst) {
            let n = self.read_once()?;
            if n == 0 {
                continue;
            }

            self.sink
                .write_all(&self.buffer[..n])
                .map_err(CaptureError::Write)?;
            self.sink.flush().map_err(CaptureError::Flush)?;

            chunks += 1;
            bytes += n as u64;
            log::trace!("chunk {}: {} bytes ({} total)", chunks, n, bytes);
        }

        Ok(CaptureStats {
            started,
            elapsed: clock.elapsed(),
            chunks,
            bytes,
        })
    }

    /// Read one chunk of `max(available, 1)` bytes.
    ///
    /// Returns 0 when the read woke up without data (timeout or signal).
    /// A read that reports end of stream means the device is gone.
    fn read_once(&mut self) -> Result<usize, CaptureError> {
        let available = match self.source.bytes_available() {
            Ok(n) => n,
            Err(e) if is_wakeup(&e) => 0,
            Err(e) => return Err(CaptureError::Read(e)),
        };
        let want = available.clamp(1, CHUNK_SIZE);

        match self.source.read_chunk(&mut self.buffer[..want]) {
            Ok(0) => Err(CaptureError::Read(io::ErrorKind::UnexpectedEof.into())),
            Ok(n) => Ok(n),
            Err(e) if is_wakeup(&e) => Ok(0),
            Err(e) => Err(CaptureError::Read(e)),
        }
    }
}

fn is_wakeup(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

/// Open the port, then the output file, and capture until `running` clears.
pub fn capture_to_file(config: &CaptureConfig, running: &AtomicBool) -> Result<CaptureStats> {
    let connection = SerialConnection::open(config.port_config.clone())?;

    println!(
        "{} Connected to {} at {} baud",
        "[OK]".green().bold(),
        connection.config().port_path.white().bold(),
        connection.config().baud_rate
    );

    let session = CaptureSession::create(connection, &config.output)?;

    println!(
        "{} Logging to: {}",
        "[LOG]".cyan().bold(),
        config.output.display().to_string().white()
    );

    let stats = session.run(running)?;
    Ok(stats)
}

/// Run a capture with a Ctrl+C handler wired to the stop flag
pub fn run_capture(config: CaptureConfig) -> Result<CaptureStats> {
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(Arc::clone(&running))?;

    print_header(&config);
    let stats = capture_to_file(&config, &running)?;

    println!("\n{}", "Logging stopped by user.".yellow());
    print_summary(&config, &stats);
    Ok(stats)
}

/// Setup Ctrl+C signal handler
fn ctrlc_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .with_context(|| "Failed to set Ctrl+C handler")
}

fn print_header(config: &CaptureConfig) {
    println!("{}", "=".repeat(70).dimmed());
    println!(
        "{}: {}",
        "Port".cyan(),
        config.port_config.port_path.white()
    );
    println!(
        "{}: {}",
        "Baud".cyan(),
        config.port_config.baud_rate.to_string().white()
    );
    println!(
        "{}: {}",
        "Output".cyan(),
        config.output.display().to_string().white()
    );
    println!("{}", "=".repeat(70).dimmed());
    println!("{}", "Press Ctrl+C to stop\n".yellow());
}

fn print_summary(config: &CaptureConfig, stats: &CaptureStats) {
    println!("\n{}", "=".repeat(70).dimmed());
    println!("{}", "--- Capture Summary ---".cyan().bold());
    println!("Started: {}", stats.started.format("%Y-%m-%d %H:%M:%S"));
    println!("Duration: {:.1}s", stats.elapsed.as_secs_f64());
    println!("Chunks: {}", stats.chunks);
    println!("Bytes: {}", stats.bytes.to_string().white().bold());
    println!("Saved to: {}", config.output.display().to_string().white());
    println!("{}", "=".repeat(70).dimmed());
}
