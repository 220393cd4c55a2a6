//! Per-session configuration step.
//!
//! Ties the generators to an encode loop: the reference topology is derived
//! once per GOP mode change and walked frame by frame, the overlay is
//! regenerated for every frame, and the OSD palette is remapped once from the
//! configured colour table.

use tracing::{debug, info, warn};

use crate::encoder::gop::{
    FramePlan, GopCursor, GopMode, ReferenceTopology, MAX_TEMPORAL_LAYERS,
};
use crate::encoder::SessionConfig;
use crate::error::{EncCfgError, Result};
use crate::osd::palette::{self, PaletteTable};
use crate::osd::{self, OverlayDescriptorSet};

/// Configuration state of one encoder session.
pub struct EncoderSession {
    /// Current configuration.
    config: SessionConfig,
    /// Cursor over the cached topology for the current GOP mode.
    cursor: GopCursor,
    /// Frames prepared so far; drives overlay polarity.
    frame_counter: u64,
}

impl EncoderSession {
    /// Create a session, deriving the topology for the configured mode.
    pub fn new(config: SessionConfig) -> Self {
        let topology = ReferenceTopology::for_mode(config.gop_mode);
        info!(
            "Encoder session created: gop_mode={}, target_bitrate={}, osd_regions={}",
            config.gop_mode, config.target_bitrate, config.osd_region_count
        );
        Self {
            config,
            cursor: GopCursor::new(topology),
            frame_counter: 0,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current GOP mode.
    pub fn gop_mode(&self) -> GopMode {
        self.config.gop_mode
    }

    /// Cached topology for the current GOP mode.
    pub fn topology(&self) -> &ReferenceTopology {
        self.cursor.topology()
    }

    /// Frames prepared so far.
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Switch to a new GOP mode from a raw selector.
    ///
    /// The topology is only recomputed when the mode actually changes, and the
    /// cursor then restarts at the beginning of a cycle. On error the previous
    /// topology stays in effect. Returns whether the topology changed.
    pub fn set_gop_mode(&mut self, raw_mode: i32) -> Result<bool> {
        let mode = match GopMode::from_raw(raw_mode) {
            Ok(mode) => mode,
            Err(e) => {
                warn!(
                    "Rejected GOP mode {}, keeping {}: {}",
                    raw_mode, self.config.gop_mode, e
                );
                return Err(e);
            }
        };
        if mode == self.config.gop_mode {
            return Ok(false);
        }

        let topology = ReferenceTopology::for_mode(mode);
        info!("GOP mode changed: {} -> {}", self.config.gop_mode, mode);
        self.config.gop_mode = mode;
        self.cursor = GopCursor::new(topology);
        Ok(true)
    }

    /// Update the target bitrate used for layer allocation.
    pub fn set_target_bitrate(&mut self, bitrate: u32) {
        self.config.target_bitrate = bitrate;
    }

    /// Per-layer bitrates for the current topology and target bitrate.
    pub fn layer_bitrates(&self) -> [u32; MAX_TEMPORAL_LAYERS] {
        self.topology().layer_bitrates(self.config.target_bitrate)
    }

    /// Advance to the next frame and return its reference plan.
    ///
    /// Returns `None` when temporal layering is disabled.
    pub fn next_frame(&mut self) -> Option<FramePlan> {
        self.frame_counter += 1;
        self.cursor.next_frame()
    }

    /// Generate the overlay for the most recently advanced frame into
    /// `buffer`.
    ///
    /// Call once per frame after [`next_frame`](Self::next_frame), before the
    /// frame is submitted to the encoder. Fails with `InvalidInput` if no
    /// frame has been advanced yet.
    pub fn prepare_overlay(&self, buffer: &mut [u8]) -> Result<OverlayDescriptorSet> {
        let frame = self.frame_counter.checked_sub(1).ok_or_else(|| {
            EncCfgError::InvalidInput("overlay requested before the first frame".to_string())
        })?;
        osd::generate_overlay(frame, buffer, self.config.osd_region_count)
    }

    /// OSD palette for the configured colour table, if any.
    pub fn palette(&self) -> Option<PaletteTable> {
        let table = self.config.osd_palette.as_ref()?;
        debug!("Remapping OSD palette from {} colours", table.len());
        Some(palette::generate_palette(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::gop::generate_topology;
    use crate::osd::palette::OsdColor;

    #[test]
    fn test_new_session_uses_configured_mode() {
        let session = EncoderSession::new(SessionConfig::new().with_gop_mode(GopMode::Tsvc3));
        assert_eq!(session.gop_mode(), GopMode::Tsvc3);
        assert_eq!(session.topology(), &ReferenceTopology::for_mode(GopMode::Tsvc3));
        assert_eq!(session.frame_counter(), 0);
    }

    #[test]
    fn test_mode_change_recomputes_topology() {
        let mut session = EncoderSession::new(SessionConfig::new());
        assert!(!session.topology().enabled);

        assert!(session.set_gop_mode(3).unwrap());
        assert_eq!(session.gop_mode(), GopMode::Tsvc4);
        assert_eq!(session.topology().gop_length, 8);
        assert_eq!(session.topology(), &generate_topology(3).unwrap());

        // Same mode again is a no-op.
        assert!(!session.set_gop_mode(3).unwrap());
    }

    #[test]
    fn test_invalid_mode_keeps_previous_topology() {
        let mut session = EncoderSession::new(SessionConfig::new().with_gop_mode(GopMode::Tsvc2));
        session.next_frame();

        assert_eq!(session.set_gop_mode(99), Err(EncCfgError::InvalidGopMode(99)));
        assert_eq!(session.gop_mode(), GopMode::Tsvc2);
        assert_eq!(session.topology(), &ReferenceTopology::for_mode(GopMode::Tsvc2));

        // The cursor was not disturbed either.
        assert_eq!(session.next_frame().unwrap().position, 1);
    }

    #[test]
    fn test_mode_change_restarts_cycle() {
        let mut session = EncoderSession::new(SessionConfig::new().with_gop_mode(GopMode::Tsvc2));
        session.next_frame();
        session.next_frame();

        session.set_gop_mode(2).unwrap();
        let plan = session.next_frame().unwrap();
        assert_eq!(plan.position, 0);
        assert_eq!(session.frame_counter(), 3);
    }

    #[test]
    fn test_disabled_session_has_no_plan() {
        let mut session = EncoderSession::new(SessionConfig::new());
        assert!(session.next_frame().is_none());
        assert_eq!(session.layer_bitrates(), [0; 4]);
    }

    #[test]
    fn test_layer_bitrates() {
        let mut session = EncoderSession::new(
            SessionConfig::new()
                .with_gop_mode(GopMode::Tsvc3)
                .with_target_bitrate(2_000_000),
        );
        assert_eq!(session.layer_bitrates(), [1_000_000, 500_000, 500_000, 0]);

        session.set_target_bitrate(4_000_000);
        assert_eq!(session.layer_bitrates(), [2_000_000, 1_000_000, 1_000_000, 0]);
    }

    #[test]
    fn test_overlay_polarity_follows_frames() {
        let mut session = EncoderSession::new(SessionConfig::new().with_gop_mode(GopMode::Tsvc4));
        let mut buf = vec![0u8; 8 * 1024];

        session.next_frame();
        let first = session.prepare_overlay(&mut buf).unwrap();
        session.next_frame();
        let second = session.prepare_overlay(&mut buf).unwrap();

        assert!(!first.is_inverted());
        assert!(second.is_inverted());
    }

    #[test]
    fn test_overlay_uses_configured_region_count() {
        let mut session = EncoderSession::new(SessionConfig::new().with_osd_region_count(2));
        session.next_frame();
        let mut buf = vec![0u8; 2 * 1024];
        let set = session.prepare_overlay(&mut buf).unwrap();
        assert_eq!(set.regions.len(), 2);

        let mut small = vec![0u8; 1024];
        assert!(matches!(
            session.prepare_overlay(&mut small),
            Err(EncCfgError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_overlay_before_first_frame_rejected() {
        let mut session = EncoderSession::new(SessionConfig::new().with_gop_mode(GopMode::Tsvc2));
        let mut buf = vec![0x33u8; 8 * 1024];

        assert!(matches!(
            session.prepare_overlay(&mut buf),
            Err(EncCfgError::InvalidInput(_))
        ));
        assert!(buf.iter().all(|&b| b == 0x33));

        session.next_frame();
        assert!(!session.prepare_overlay(&mut buf).unwrap().is_inverted());
    }

    #[test]
    fn test_palette() {
        let session = EncoderSession::new(SessionConfig::new());
        assert!(session.palette().is_none());

        let table = std::array::from_fn(|i| OsdColor::from_yuva(i as u8, 0x80, 0x80, 0xff));
        let session = EncoderSession::new(SessionConfig::new().with_osd_palette(table));
        let palette = session.palette().unwrap();
        assert_eq!(palette[9], table[1]);
    }
}
