//! Board profiles
//!
//! Built-in profiles carry the per-board defaults for capture baud rate and
//! how bossac has to be driven.

pub mod due;
pub mod profile;

pub use due::{DUE_NATIVE_PROFILE, DUE_PROGRAMMING_PROFILE};
pub use profile::BoardProfile;

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Registry of built-in board profiles
pub static BOARD_PROFILES: Lazy<HashMap<&'static str, &'static BoardProfile>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("due", &*DUE_NATIVE_PROFILE);
    m.insert("arduino-due", &*DUE_NATIVE_PROFILE);
    m.insert("due-native", &*DUE_NATIVE_PROFILE);
    m.insert("due-programming", &*DUE_PROGRAMMING_PROFILE);
    m.insert("due-prog", &*DUE_PROGRAMMING_PROFILE);
    m
});

/// Get a board profile by name
pub fn get_profile(name: &str) -> Option<&'static BoardProfile> {
    BOARD_PROFILES.get(name.to_lowercase().as_str()).copied()
}

/// Canonical profile names (no aliases)
pub fn profile_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = vec!["due", "due-programming"];
    names.sort();
    names
}

/// Look up a profile or fail with the list of valid names
pub fn require_profile(name: &str) -> anyhow::Result<&'static BoardProfile> {
    get_profile(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown board profile: {}. Available: {}",
            name,
            profile_names().join(", ")
        )
    })
}
