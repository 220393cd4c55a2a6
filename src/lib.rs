//! # enccfg
//!
//! Encoder session configuration derivation for hardware video encoders.
//!
//! Given a temporal-scalability GOP mode, a frame counter and an overlay
//! request, this crate derives:
//!
//! - the reference topology of one GOP cycle (temporal layers, reference
//!   parents, long-term reference slots and layer bitrate weights),
//! - the OSD overlay regions for a frame, written into a caller-owned buffer,
//! - the 256-entry OSD palette remapped from an 8-colour table.
//!
//! The results are plain values handed to the hardware session unmodified.
//!
//! ```
//! use enccfg::{generate_topology, EncoderSession, GopMode, SessionConfig};
//!
//! let topology = generate_topology(3)?;
//! assert_eq!(topology.gop_length, 8);
//!
//! let mut session = EncoderSession::new(SessionConfig::new().with_gop_mode(GopMode::Tsvc2));
//! let mut osd = vec![0u8; 8 * 1024];
//! let plan = session.next_frame().expect("tsvc2 is enabled");
//! let overlay = session.prepare_overlay(&mut osd)?;
//! assert_eq!(plan.entry.temporal_id, 0);
//! assert_eq!(overlay.regions.len(), 8);
//! # Ok::<(), enccfg::EncCfgError>(())
//! ```

pub mod encoder;
pub mod error;
pub mod osd;
pub mod session;

pub use encoder::gop::{
    generate_topology, FramePlan, GopCursor, GopEntry, GopMode, ReferenceTopology,
    LAYER_WEIGHT_TOTAL, MAX_TEMPORAL_LAYERS,
};
pub use encoder::SessionConfig;
pub use error::{EncCfgError, Result};
pub use osd::palette::{fill_palette, generate_palette, OsdColor, PaletteTable};
pub use osd::{
    generate_default_overlay, generate_overlay, OverlayDescriptorSet, OverlayRegion,
    MAX_OSD_REGIONS,
};
pub use session::EncoderSession;
