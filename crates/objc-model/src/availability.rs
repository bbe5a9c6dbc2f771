// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

//! Platform availability records attached to every declaration.

use serde::Deserialize;
use std::fmt;

/// A three-component platform version, e.g. `11.0.2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
pub struct Version {
    pub major: u8,
    #[serde(default)]
    pub minor: u8,
    #[serde(default)]
    pub patch: u8,
}

impl Version {
    pub fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Packed little-endian-friendly form used by the binary backend:
    /// `major << 16 | minor << 8 | patch`, with `0` reserved for "absent".
    pub fn packed(&self) -> u32 {
        ((self.major as u32) << 16) | ((self.minor as u32) << 8) | self.patch as u32
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Availability of a declaration on one platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformAvailability {
    #[serde(default)]
    pub introduced: Option<Version>,
    #[serde(default)]
    pub deprecated: Option<Version>,
    #[serde(default)]
    pub obsoleted: Option<Version>,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl PlatformAvailability {
    pub fn is_available(&self) -> bool {
        !self.unavailable
    }
}

/// Per-platform availability. The generator targets iOS and its app
/// extension environment; other platforms never reach the binary output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Availability {
    #[serde(default)]
    pub ios: PlatformAvailability,
    #[serde(default)]
    pub ios_app_extension: PlatformAvailability,
}
