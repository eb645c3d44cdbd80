//! Configuration file support
//!
//! Settings are resolved once, in this order of precedence: command line,
//! TOML config file, board profile, built-in defaults. The result is an
//! immutable `CaptureConfig` / `UploadConfig` handed to the command.
//!
//! ```toml
//! board = "due"
//!
//! [capture]
//! port = "/dev/cu.usbserial-FT611XTT3"
//! baud = 230400
//! output = "output.bin"
//!
//! [upload]
//! firmware = ".pio/build/due/firmware.bin"
//! bossac = "~/Library/Arduino15/packages/arduino/tools/bossac/1.6.1-arduino/bossac"
//! ```

use crate::boards::{require_profile, BoardProfile};
use crate::serial::port::DEFAULT_CAPTURE_PORT;
use crate::serial::{CaptureConfig, PortConfig};
use crate::upload::UploadConfig;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default board when neither the CLI nor the file names one
pub const DEFAULT_BOARD: &str = "due";

/// Default capture output file
pub const DEFAULT_OUTPUT: &str = "output.bin";

/// `[capture]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Read wake-up period in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// `[upload]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bossac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub touch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erase: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_from_flash: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_args: Option<Vec<String>>,
}

/// Contents of a config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    pub capture: CaptureSection,
    pub upload: UploadSection,
}

/// Command line values for `capture`
#[derive(Debug, Clone, Default)]
pub struct CaptureOverrides {
    pub board: Option<String>,
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub output: Option<PathBuf>,
}

/// Command line values for `upload`
#[derive(Debug, Clone, Default)]
pub struct UploadOverrides {
    pub board: Option<String>,
    pub firmware: Option<PathBuf>,
    pub port: Option<String>,
    pub bossac: Option<String>,
    pub no_touch: bool,
}

impl FileConfig {
    /// Parse a config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if given, otherwise start from an empty config
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    fn board(&self, cli: Option<&str>) -> Result<&'static BoardProfile> {
        let name = cli
            .or(self.board.as_deref())
            .unwrap_or(DEFAULT_BOARD);
        require_profile(name)
    }

    /// Resolve the settings for a capture run
    pub fn capture_config(&self, cli: &CaptureOverrides) -> Result<CaptureConfig> {
        let profile = self.board(cli.board.as_deref())?;
        let section = &self.capture;

        let port_path = cli
            .port
            .clone()
            .or_else(|| section.port.clone())
            .unwrap_or_else(|| DEFAULT_CAPTURE_PORT.to_string());
        let baud = cli.baud.or(section.baud).unwrap_or(profile.capture_baud);

        let mut port_config = PortConfig::new(&port_path).with_baud_rate(baud);
        if let Some(ms) = section.timeout_ms {
            // A zero timeout turns every blocking read into an instant wake-up
            ensure!(ms >= 1, "capture.timeout_ms must be at least 1 (got {})", ms);
            port_config = port_config.with_timeout(Duration::from_millis(ms));
        }

        let output = cli
            .output
            .clone()
            .or_else(|| section.output.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

        Ok(CaptureConfig {
            port_config,
            output,
        })
    }

    /// Resolve the settings for an upload
    pub fn upload_config(&self, cli: &UploadOverrides) -> Result<UploadConfig> {
        let profile = self.board(cli.board.as_deref())?;
        let section = &self.upload;
        let defaults = UploadConfig::default();

        let bossac = cli
            .bossac
            .as_deref()
            .or(section.bossac.as_deref())
            .map(expand_tilde)
            .unwrap_or_else(|| expand_tilde(&defaults.bossac.to_string_lossy()));

        let touch_baud = if cli.no_touch || section.touch == Some(false) {
            None
        } else {
            profile.upload.touch_baud
        };

        Ok(UploadConfig {
            firmware: cli
                .firmware
                .clone()
                .or_else(|| section.firmware.clone())
                .unwrap_or(defaults.firmware),
            bossac,
            port: cli.port.clone().or_else(|| section.port.clone()),
            device_dir: section.device_dir.clone().unwrap_or(defaults.device_dir),
            device_prefix: section
                .device_prefix
                .clone()
                .unwrap_or_else(|| profile.upload.device_prefix.clone()),
            port_stem: profile.upload.port_stem.clone(),
            native_usb: profile.upload.native_usb,
            touch_baud,
            settle: section
                .settle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle),
            erase: section.erase.unwrap_or(defaults.erase),
            verify: section.verify.unwrap_or(defaults.verify),
            boot_from_flash: section.boot_from_flash.unwrap_or(defaults.boot_from_flash),
            extra_args: section.extra_args.clone().unwrap_or_default(),
        })
    }

    /// Fully populated config, suitable for writing out as a starting file
    pub fn effective(&self, board: Option<&str>) -> Result<Self> {
        let profile = self.board(board)?;
        let capture = self.capture_config(&CaptureOverrides {
            board: board.map(str::to_string),
            ..Default::default()
        })?;
        let upload = self.upload_config(&UploadOverrides {
            board: board.map(str::to_string),
            ..Default::default()
        })?;

        Ok(Self {
            board: Some(profile.id.clone()),
            capture: CaptureSection {
                port: Some(capture.port_config.port_path),
                baud: Some(capture.port_config.baud_rate),
                output: Some(capture.output),
                timeout_ms: Some(capture.port_config.timeout.as_millis() as u64),
            },
            upload: UploadSection {
                firmware: Some(upload.firmware),
                bossac: Some(upload.bossac.display().to_string()),
                port: upload.port,
                device_dir: Some(upload.device_dir),
                device_prefix: Some(upload.device_prefix),
                touch: Some(upload.touch_baud.is_some()),
                settle_ms: Some(upload.settle.as_millis() as u64),
                erase: Some(upload.erase),
                verify: Some(upload.verify),
                boot_from_flash: Some(upload.boot_from_flash),
                extra_args: Some(upload.extra_args),
            },
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

/// Expand a leading `~/` using `$HOME`
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    } else if path == "~" {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_scripts() {
        let config = FileConfig::default();
        let capture = config.capture_config(&CaptureOverrides::default()).unwrap();

        assert_eq!(capture.port_config.port_path, "/dev/cu.usbserial-FT611XTT3");
        assert_eq!(capture.port_config.baud_rate, 230400);
        assert_eq!(capture.output, PathBuf::from("output.bin"));

        let upload = config.upload_config(&UploadOverrides::default()).unwrap();
        assert_eq!(upload.firmware, PathBuf::from(".pio/build/due/firmware.bin"));
        assert!(upload.bossac.ends_with("tools/bossac/1.6.1-arduino/bossac"));
        assert_eq!(upload.touch_baud, Some(1200));
        assert!(upload.native_usb);
        assert_eq!(upload.port, None);
    }

    #[test]
    fn test_partial_file() {
        let config = FileConfig::from_toml(
            r#"
[capture]
baud = 115200
"#,
        )
        .unwrap();

        assert_eq!(config.capture.baud, Some(115200));
        assert_eq!(config.capture.port, None);
        assert_eq!(config.upload, UploadSection::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(FileConfig::from_toml("[capture]\nbaudrate = 9600\n").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let config = FileConfig::from_toml(
            r#"
[capture]
port = "/dev/ttyUSB1"
baud = 115200
output = "from-file.bin"
timeout_ms = 250
"#,
        )
        .unwrap();

        let capture = config
            .capture_config(&CaptureOverrides {
                baud: Some(921600),
                output: Some(PathBuf::from("cli.bin")),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(capture.port_config.port_path, "/dev/ttyUSB1");
        assert_eq!(capture.port_config.baud_rate, 921600);
        assert_eq!(capture.port_config.timeout, Duration::from_millis(250));
        assert_eq!(capture.output, PathBuf::from("cli.bin"));
    }

    #[test]
    fn test_board_selects_upload_flags() {
        let config = FileConfig::from_toml("board = \"due-programming\"\n").unwrap();
        let upload = config.upload_config(&UploadOverrides::default()).unwrap();
        assert!(!upload.native_usb);

        let upload = config
            .upload_config(&UploadOverrides {
                board: Some("due".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert!(upload.native_usb);
    }

    #[test]
    fn test_zero_read_timeout_rejected() {
        let config = FileConfig::from_toml("[capture]\ntimeout_ms = 0\n").unwrap();
        let err = config
            .capture_config(&CaptureOverrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));

        let config = FileConfig::from_toml("[capture]\ntimeout_ms = 1\n").unwrap();
        let capture = config.capture_config(&CaptureOverrides::default()).unwrap();
        assert_eq!(capture.port_config.timeout, Duration::from_millis(1));
    }

    #[test]
    fn test_unknown_board() {
        let config = FileConfig::from_toml("board = \"uno\"\n").unwrap();
        assert!(config.capture_config(&CaptureOverrides::default()).is_err());
    }

    #[test]
    fn test_touch_can_be_disabled() {
        let config = FileConfig::from_toml("[upload]\ntouch = false\n").unwrap();
        let upload = config.upload_config(&UploadOverrides::default()).unwrap();
        assert_eq!(upload.touch_baud, None);

        let upload = FileConfig::default()
            .upload_config(&UploadOverrides {
                no_touch: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(upload.touch_baud, None);
    }

    #[test]
    fn test_upload_section() {
        let config = FileConfig::from_toml(
            r#"
[upload]
firmware = "build/app.bin"
bossac = "/usr/local/bin/bossac"
device_dir = "/tmp/dev"
device_prefix = "ttyACM"
settle_ms = 1000
verify = false
extra_args = ["-R"]
"#,
        )
        .unwrap();
        let upload = config.upload_config(&UploadOverrides::default()).unwrap();

        assert_eq!(upload.firmware, PathBuf::from("build/app.bin"));
        assert_eq!(upload.bossac, PathBuf::from("/usr/local/bin/bossac"));
        assert_eq!(upload.device_dir, PathBuf::from("/tmp/dev"));
        assert_eq!(upload.device_prefix, "ttyACM");
        assert_eq!(upload.settle, Duration::from_millis(1000));
        assert!(!upload.verify);
        assert!(upload.erase);
        assert_eq!(upload.extra_args, vec!["-R".to_string()]);
    }

    #[test]
    fn test_effective_config_reparses() {
        let effective = FileConfig::default().effective(None).unwrap();
        let text = effective.to_toml().unwrap();
        let parsed = FileConfig::from_toml(&text).unwrap();

        assert_eq!(parsed, effective);
        assert_eq!(parsed.board.as_deref(), Some("due"));
        assert_eq!(parsed.capture.baud, Some(230400));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("due-serial.toml");
        std::fs::write(&path, "[capture]\noutput = \"log.bin\"\n").unwrap();

        let config = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(config.capture.output, Some(PathBuf::from("log.bin")));

        let missing = dir.path().join("missing.toml");
        let err = FileConfig::load(Some(&missing)).unwrap_err();
        assert!(format!("{:#}", err).contains("missing.toml"));
    }

    #[test]
    fn test_expand_tilde() {
        let absolute = expand_tilde("/usr/bin/bossac");
        assert_eq!(absolute, PathBuf::from("/usr/bin/bossac"));

        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_tilde("~/bin/bossac"), PathBuf::from(home).join("bin/bossac"));
        }
    }
}
