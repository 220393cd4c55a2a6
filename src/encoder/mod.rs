//! Encoder session configuration.
//!
//! This module provides:
//! - Session configuration (`SessionConfig`) with builder-style setters.
//! - Temporal-SVC reference topology derivation (`gop` module).

pub mod gop;

use crate::osd::palette::OsdColor;
use crate::osd::MAX_OSD_REGIONS;

use self::gop::GopMode;

// Default session configuration constants.

/// Default target bitrate in bits per second (4 Mbps).
pub const DEFAULT_TARGET_BITRATE: u32 = 4_000_000;

/// Default GOP mode (no temporal layering).
pub const DEFAULT_GOP_MODE: GopMode = GopMode::Disabled;

/// Default number of OSD regions generated per frame.
pub const DEFAULT_OSD_REGION_COUNT: u32 = MAX_OSD_REGIONS;

/// Encoder session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct SessionConfig {
    /// Temporal-scalability mode.
    pub gop_mode: GopMode,
    /// Target bitrate in bits per second, split across temporal layers.
    pub target_bitrate: u32,
    /// Number of OSD regions generated per frame.
    pub osd_region_count: u32,
    /// 8-entry OSD colour table, replicated into the 256-entry palette.
    pub osd_palette: Option<[OsdColor; 8]>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self {
            gop_mode: DEFAULT_GOP_MODE,
            target_bitrate: DEFAULT_TARGET_BITRATE,
            osd_region_count: DEFAULT_OSD_REGION_COUNT,
            osd_palette: None,
        }
    }

    /// Set the GOP mode.
    pub fn with_gop_mode(mut self, mode: GopMode) -> Self {
        self.gop_mode = mode;
        self
    }

    /// Set the target bitrate.
    pub fn with_target_bitrate(mut self, bitrate: u32) -> Self {
        self.target_bitrate = bitrate;
        self
    }

    /// Set the number of OSD regions.
    pub fn with_osd_region_count(mut self, count: u32) -> Self {
        self.osd_region_count = count;
        self
    }

    /// Set the OSD colour table.
    pub fn with_osd_palette(mut self, table: [OsdColor; 8]) -> Self {
        self.osd_palette = Some(table);
        self
    }
}
