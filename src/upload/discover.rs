//! Device node discovery
//!
//! The board is found the way a shell glob would find it: every entry of
//! the device directory whose name starts with a prefix. The first number in
//! the matching file name is then glued onto the callout stem, because bossac
//! wants `cu.usbmodem14101` where the node shows up as `tty.usbmodem14101`.

use super::{UploadConfig, UploadError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Device nodes in `dir` whose file name starts with `prefix`, sorted by name
pub fn find_devices(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, UploadError> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| UploadError::DeviceDir {
            path: dir.to_path_buf(),
            source,
        })?;

        if entry.file_name().to_string_lossy().starts_with(prefix) {
            found.push(entry.into_path());
        }
    }

    Ok(found)
}

/// First run of ASCII digits in the file name of `path`
pub fn port_number(path: &Path) -> Option<String> {
    let text = path.file_name()?.to_string_lossy();
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Callout port name for a discovered node, e.g. `cu.usbmodem14101`
pub fn bossac_port_name(path: &Path, stem: &str) -> Option<String> {
    port_number(path).map(|n| format!("{}{}", stem, n))
}

/// Port name to hand to bossac: the configured one, or the first match
pub fn resolve_port(config: &UploadConfig) -> Result<String, UploadError> {
    if let Some(ref port) = config.port {
        return Ok(port.clone());
    }

    let devices = find_devices(&config.device_dir, &config.device_prefix)?;
    let first = devices.first().ok_or_else(|| UploadError::NoPortFound {
        dir: config.device_dir.clone(),
        prefix: config.device_prefix.clone(),
    })?;

    if devices.len() > 1 {
        log::warn!(
            "{} devices match {}*, using {}",
            devices.len(),
            config.device_prefix,
            first.display()
        );
    }
    log::debug!("discovered {}", first.display());

    bossac_port_name(first, &config.port_stem)
        .ok_or_else(|| UploadError::NoPortNumber(first.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn device_dir(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    fn config_for(dir: &Path) -> UploadConfig {
        UploadConfig {
            device_dir: dir.to_path_buf(),
            ..UploadConfig::default()
        }
    }

    #[test]
    fn test_prefix_match_sorted() {
        let dir = device_dir(&[
            "tty.usbmodem2101",
            "tty.Bluetooth-Incoming-Port",
            "tty.usbmodem1101",
            "cu.usbmodem1101",
        ]);

        let found = find_devices(dir.path(), "tty.usb").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["tty.usbmodem1101", "tty.usbmodem2101"]);
    }

    #[test]
    fn test_port_number() {
        assert_eq!(
            port_number(Path::new("/dev/tty.usbmodem14101")),
            Some("14101".to_string())
        );
        assert_eq!(
            port_number(Path::new("/dev/tty.usbmodemFA13 1")),
            Some("13".to_string())
        );
        assert_eq!(port_number(Path::new("/dev/tty.usbmodem")), None);
        assert_eq!(port_number(Path::new("/dev2/tty.usbmodem")), None);
    }

    #[test]
    fn test_bossac_port_name() {
        assert_eq!(
            bossac_port_name(Path::new("/dev/tty.usbmodem14101"), "cu.usbmodem"),
            Some("cu.usbmodem14101".to_string())
        );
    }

    #[test]
    fn test_resolve_prefers_explicit_port() {
        let dir = device_dir(&["tty.usbmodem1101"]);
        let mut config = config_for(dir.path());
        config.port = Some("cu.usbmodem9".to_string());

        assert_eq!(resolve_port(&config).unwrap(), "cu.usbmodem9");
    }

    #[test]
    fn test_resolve_discovers_first_match() {
        let dir = device_dir(&["tty.usbmodem2101", "tty.usbmodem1101"]);
        let config = config_for(dir.path());

        assert_eq!(resolve_port(&config).unwrap(), "cu.usbmodem1101");
    }

    #[test]
    fn test_resolve_without_match() {
        let dir = device_dir(&["ttyS0"]);
        let config = config_for(dir.path());

        assert!(matches!(
            resolve_port(&config),
            Err(UploadError::NoPortFound { .. })
        ));
    }

    #[test]
    fn test_resolve_without_digits() {
        let dir = device_dir(&["tty.usbserial-FTDI"]);
        let config = config_for(dir.path());

        assert!(matches!(
            resolve_port(&config),
            Err(UploadError::NoPortNumber(_))
        ));
    }

    #[test]
    fn test_missing_device_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        assert!(matches!(
            find_devices(&missing, "tty.usb"),
            Err(UploadError::DeviceDir { .. })
        ));
    }
}
