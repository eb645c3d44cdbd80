//! Due Serial Tools
//!
//! Host-side helpers for an Arduino Due (SAM3X8E) firmware workflow.
//!
//! # Features
//!
//! - **Serial Capture**: Stream raw bytes from a serial port into a binary file
//!   until Ctrl+C, flushing after every chunk
//! - **Firmware Upload**: Find the board, touch it at 1200 baud and run bossac
//!   on a prebuilt image
//! - **Board Profiles**: Built-in profiles for the Due's native and
//!   programming USB ports
//!
//! # Usage
//!
//! ```bash
//! # Capture to output.bin with the default port and 230400 baud
//! due-serial capture
//!
//! # Capture from a specific port
//! due-serial capture -p /dev/ttyUSB0 -b 115200 -o boot.bin
//!
//! # Upload .pio/build/due/firmware.bin through the native USB port
//! due-serial upload
//!
//! # Show which port upload would use
//! due-serial discover
//!
//! # Print the effective configuration as TOML
//! due-serial config > due-serial.toml
//! ```

mod boards;
mod config;
mod serial;
mod upload;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use boards::{get_profile, profile_names, BoardProfile};
use config::{CaptureOverrides, FileConfig, UploadOverrides};

/// Due Serial Tools
///
/// Serial capture and firmware upload for Arduino Due development
#[derive(Parser)]
#[command(name = "due-serial")]
#[command(version)]
#[command(about = "Serial capture and bossac upload helpers for Arduino Due firmware work")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture raw serial bytes into a file until Ctrl+C
    Capture {
        /// Serial port path (e.g., /dev/cu.usbserial-FT611XTT3)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate (overrides board profile default)
        #[arg(short, long)]
        baud: Option<u32>,

        /// Output file (truncated)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Board profile
        #[arg(long)]
        board: Option<String>,
    },

    /// Upload a prebuilt firmware image with bossac
    Upload {
        /// Firmware image
        #[arg(short, long)]
        firmware: Option<PathBuf>,

        /// Port name as bossac expects it (e.g., cu.usbmodem14101)
        #[arg(short, long)]
        port: Option<String>,

        /// Path to the bossac executable
        #[arg(long)]
        bossac: Option<String>,

        /// Board profile
        #[arg(long)]
        board: Option<String>,

        /// Skip the 1200 baud bootloader touch
        #[arg(long)]
        no_touch: bool,

        /// Print the bossac command instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// List device nodes upload would pick from
    Discover {
        /// Directory to scan
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Device name prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Board profile
        #[arg(long)]
        board: Option<String>,
    },

    /// Board profile operations
    #[command(subcommand)]
    Boards(BoardCommands),

    /// Print the effective configuration as TOML
    Config {
        /// Board profile
        #[arg(long)]
        board: Option<String>,
    },
}

#[derive(Subcommand)]
enum BoardCommands {
    /// List all built-in board profiles
    List,

    /// Show detailed information about a board profile
    Show {
        /// Board profile name (e.g., due, due-programming)
        board: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let file_config = FileConfig::load(cli.config.as_deref())?;
    if let Some(ref path) = cli.config {
        log::debug!("loaded config from {}", path.display());
    }

    match cli.command {
        Commands::Capture {
            port,
            baud,
            output,
            board,
        } => {
            let config = file_config.capture_config(&CaptureOverrides {
                board,
                port,
                baud,
                output,
            })?;
            serial::capture::run_capture(config)?;
        }

        Commands::Upload {
            firmware,
            port,
            bossac,
            board,
            no_touch,
            dry_run,
        } => {
            let config = file_config.upload_config(&UploadOverrides {
                board,
                firmware,
                port,
                bossac,
                no_touch,
            })?;
            upload::upload(&config, dry_run)?;
        }

        Commands::Discover { dir, prefix, board } => {
            let mut config = file_config.upload_config(&UploadOverrides {
                board,
                ..Default::default()
            })?;
            if let Some(dir) = dir {
                config.device_dir = dir;
            }
            if let Some(prefix) = prefix {
                config.device_prefix = prefix;
            }
            handle_discover(&config)?;
        }

        Commands::Boards(cmd) => handle_boards(cmd)?,

        Commands::Config { board } => {
            let effective = file_config.effective(board.as_deref())?;
            print!("{}", effective.to_toml()?);
        }
    }

    Ok(())
}

fn handle_discover(config: &upload::UploadConfig) -> Result<()> {
    println!(
        "{} Looking for {}* in {}",
        "[*]".cyan().bold(),
        config.device_prefix,
        config.device_dir.display()
    );

    let devices = upload::find_devices(&config.device_dir, &config.device_prefix)?;

    if devices.is_empty() {
        println!("{}", "No matching serial devices found".yellow());
        println!("\n{}", "Troubleshooting:".white().bold());
        println!("  1. Connect the board's USB port");
        println!("  2. Check the prefix: ls {}", config.device_dir.display());
        println!("  3. On Linux, try --prefix ttyACM and add your user to 'dialout'");
        return Ok(());
    }

    println!("\n{}", "Matching devices:".green().bold());
    for device in &devices {
        let bossac_port = upload::discover::bossac_port_name(device, &config.port_stem)
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}  ->  {}",
            device.display().to_string().white().bold(),
            bossac_port
        );
    }

    if let Ok(port) = upload::resolve_port(config) {
        println!("\n{} upload would use {}", "[*]".cyan().bold(), port.white());
    }

    Ok(())
}

fn handle_boards(cmd: BoardCommands) -> Result<()> {
    match cmd {
        BoardCommands::List => {
            println!("{}", "=".repeat(60));
            println!("{}", "Supported Board Profiles".cyan().bold());
            println!("{}", "=".repeat(60));

            for name in profile_names() {
                if let Some(profile) = get_profile(name) {
                    println!("\n  {}: {}", name.white().bold(), profile.description);
                    println!("    MCU: {}", profile.mcu);
                    println!("    Capture baud: {}", profile.capture_baud);
                }
            }

            println!("\n{}", "=".repeat(60));
            println!(
                "Use {} to see detailed profile information",
                "due-serial boards show <board>".cyan()
            );
        }

        BoardCommands::Show { board } => {
            let profile = boards::require_profile(&board)?;
            print_board_profile(profile);
        }
    }

    Ok(())
}

fn print_board_profile(profile: &BoardProfile) {
    println!("{}", "=".repeat(70));
    println!("{}", format!("Board Profile: {}", profile.name).cyan().bold());
    println!("{}", "=".repeat(70));

    println!("\n{}", "Basic Information:".white().bold());
    println!("  ID: {}", profile.id);
    println!("  Description: {}", profile.description);
    println!("  MCU: {}", profile.mcu);

    println!("\n{}", "Capture:".white().bold());
    println!("  Default baud rate: {}", profile.capture_baud);

    println!("\n{}", "Upload:".white().bold());
    println!("  Native USB (-U): {}", profile.upload.native_usb);
    match profile.upload.touch_baud {
        Some(baud) => println!("  Bootloader touch: {} baud", baud),
        None => println!("  Bootloader touch: {}", "none".dimmed()),
    }
    println!("  Device prefix: {}", profile.upload.device_prefix);
    println!("  bossac port stem: {}", profile.upload.port_stem);

    println!("\n{}", "=".repeat(70));
}
