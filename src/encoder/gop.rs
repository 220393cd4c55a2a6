//! GOP (Group of Pictures) reference topology for temporal-SVC encoding.
//!
//! This module derives the static reference graph of one GOP cycle from a
//! temporal-scalability mode. Each position in the cycle carries its temporal
//! layer, the position it predicts from, whether anything later in the cycle
//! predicts from it, and its long-term reference (LTR) marking.
//!
//! The topologies are fixed tables:
//!
//! ```text
//! tsvc2:   /-> P1
//!         /
//!        P0 --------> P2
//!
//! tsvc3:     /-> P1      /-> P3
//!           /           /
//!          //--------> P2
//!         //
//!        P0 ------------------> P4
//!
//! tsvc4:      /-> P1      /-> P3        /-> P5      /-> P7
//!            /           /             /           /
//!           //--------> P2            //--------> P6
//!          //                        //
//!         ///---------------------> P4
//!        ///
//!        P0 ------------------------------------------------> P8
//! ```
//!
//! The encoder driver applies the entries in submit order through
//! [`GopCursor`], which wraps after `gop_length + 1` frames.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{EncCfgError, Result};

/// Maximum number of temporal layers a topology can describe.
pub const MAX_TEMPORAL_LAYERS: usize = 4;

/// Sum of the layer weights of every enabled topology.
pub const LAYER_WEIGHT_TOTAL: u32 = 2000;

/// Temporal-scalability mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GopMode {
    /// No temporal layering; the encoder keeps its own default structure.
    #[default]
    Disabled = 0,
    /// Two temporal layers, cycle length 2.
    Tsvc2 = 1,
    /// Three temporal layers, cycle length 4.
    Tsvc3 = 2,
    /// Four temporal layers, cycle length 8, with explicit LTR slots.
    Tsvc4 = 3,
}

impl GopMode {
    /// All modes in selector order.
    pub const ALL: [GopMode; 4] = [
        GopMode::Disabled,
        GopMode::Tsvc2,
        GopMode::Tsvc3,
        GopMode::Tsvc4,
    ];

    /// Parse a raw integer selector.
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(GopMode::Disabled),
            1 => Ok(GopMode::Tsvc2),
            2 => Ok(GopMode::Tsvc3),
            3 => Ok(GopMode::Tsvc4),
            _ => Err(EncCfgError::InvalidGopMode(raw)),
        }
    }

    /// Raw integer selector for this mode.
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    /// Number of frame positions in one cycle (excluding the closing frame).
    pub fn gop_length(self) -> u32 {
        match self {
            GopMode::Disabled => 0,
            GopMode::Tsvc2 => 2,
            GopMode::Tsvc3 => 4,
            GopMode::Tsvc4 => 8,
        }
    }

    /// Number of temporal layers in use.
    pub fn num_temporal_layers(self) -> u32 {
        match self {
            GopMode::Disabled => 1,
            GopMode::Tsvc2 => 2,
            GopMode::Tsvc3 => 3,
            GopMode::Tsvc4 => 4,
        }
    }
}

impl TryFrom<i32> for GopMode {
    type Error = EncCfgError;

    fn try_from(raw: i32) -> Result<Self> {
        Self::from_raw(raw)
    }
}

impl fmt::Display for GopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GopMode::Disabled => "disabled",
            GopMode::Tsvc2 => "tsvc2",
            GopMode::Tsvc3 => "tsvc3",
            GopMode::Tsvc4 => "tsvc4",
        };
        f.write_str(name)
    }
}

impl FromStr for GopMode {
    type Err = EncCfgError;

    /// Accepts a mode name (`"tsvc3"`, `"disabled"`, case-insensitive) or the
    /// raw integer selector (`"2"`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "disabled" | "off" | "none" => return Ok(GopMode::Disabled),
            "tsvc2" => return Ok(GopMode::Tsvc2),
            "tsvc3" => return Ok(GopMode::Tsvc3),
            "tsvc4" => return Ok(GopMode::Tsvc4),
            _ => {}
        }
        let raw: i32 = s
            .parse()
            .map_err(|_| EncCfgError::InvalidInput(format!("unknown GOP mode '{s}'")))?;
        Self::from_raw(raw)
    }
}

/// One position in a GOP cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GopEntry {
    /// Temporal layer ID (0 = base layer).
    pub temporal_id: u8,
    /// Index of the entry this frame predicts from (0 for the root).
    pub ref_parent_index: u32,
    /// No later entry in the cycle references this one.
    pub is_disposable: bool,
    /// This frame is additionally marked into a long-term reference slot.
    pub is_long_term_ref: bool,
    /// LTR slot (0-based), meaningful only if `is_long_term_ref`.
    pub long_term_slot: u8,
}

impl GopEntry {
    const fn reference(temporal_id: u8, ref_parent_index: u32) -> Self {
        Self {
            temporal_id,
            ref_parent_index,
            is_disposable: false,
            is_long_term_ref: false,
            long_term_slot: 0,
        }
    }

    const fn disposable(temporal_id: u8, ref_parent_index: u32) -> Self {
        Self {
            temporal_id,
            ref_parent_index,
            is_disposable: true,
            is_long_term_ref: false,
            long_term_slot: 0,
        }
    }

    const fn long_term(temporal_id: u8, ref_parent_index: u32, slot: u8) -> Self {
        Self {
            temporal_id,
            ref_parent_index,
            is_disposable: false,
            is_long_term_ref: true,
            long_term_slot: slot,
        }
    }

    /// Whether later frames may predict from this one.
    pub fn is_reference(&self) -> bool {
        !self.is_disposable
    }

    /// LTR slot this entry is marked into, if any.
    pub fn long_term_slot(&self) -> Option<u8> {
        self.is_long_term_ref.then_some(self.long_term_slot)
    }
}

const TSVC2_ENTRIES: [GopEntry; 3] = [
    GopEntry::reference(0, 0),
    GopEntry::disposable(1, 0),
    GopEntry::reference(0, 0),
];

const TSVC3_ENTRIES: [GopEntry; 5] = [
    GopEntry::reference(0, 0),
    GopEntry::disposable(2, 0),
    GopEntry::reference(1, 0),
    GopEntry::disposable(2, 2),
    GopEntry::reference(0, 0),
];

const TSVC4_ENTRIES: [GopEntry; 9] = [
    GopEntry::long_term(0, 0, 0),
    GopEntry::disposable(3, 0),
    GopEntry::reference(2, 0),
    GopEntry::disposable(3, 2),
    GopEntry::long_term(1, 0, 1),
    GopEntry::disposable(3, 4),
    GopEntry::reference(2, 4),
    GopEntry::disposable(3, 6),
    GopEntry::long_term(0, 0, 0),
];

/// Static reference graph for one GOP cycle.
///
/// Immutable for the lifetime of a GOP mode; recomputed only when the mode
/// changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTopology {
    /// False only for [`GopMode::Disabled`].
    pub enabled: bool,
    /// Number of frame positions in one cycle.
    pub gop_length: u32,
    /// Relative bitrate weight per temporal layer (unused layers are 0).
    pub layer_weights: [u32; MAX_TEMPORAL_LAYERS],
    /// `gop_length + 1` entries, including the closing base-layer frame.
    pub entries: Vec<GopEntry>,
    /// Periodic LTR rotation interval in frames (0 = explicit marking only).
    pub lt_ref_interval: u32,
    /// Number of distinct LTR slots in use.
    pub max_lt_ref_slots: u32,
}

impl Default for ReferenceTopology {
    fn default() -> Self {
        Self::disabled()
    }
}

impl ReferenceTopology {
    /// Topology that leaves reference structure to the encoder's default.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            gop_length: 0,
            layer_weights: [0; MAX_TEMPORAL_LAYERS],
            entries: Vec::new(),
            lt_ref_interval: 0,
            max_lt_ref_slots: 0,
        }
    }

    /// Build the fixed topology for a mode.
    pub fn for_mode(mode: GopMode) -> Self {
        match mode {
            GopMode::Disabled => Self::disabled(),
            GopMode::Tsvc2 => Self {
                enabled: true,
                gop_length: 2,
                layer_weights: [1400, 600, 0, 0],
                entries: TSVC2_ENTRIES.to_vec(),
                lt_ref_interval: 0,
                max_lt_ref_slots: 0,
            },
            // LTR slots are reserved and rotated every 10 frames by the encoder;
            // no entry is marked here.
            GopMode::Tsvc3 => Self {
                enabled: true,
                gop_length: 4,
                layer_weights: [1000, 500, 500, 0],
                entries: TSVC3_ENTRIES.to_vec(),
                lt_ref_interval: 10,
                max_lt_ref_slots: 3,
            },
            GopMode::Tsvc4 => Self {
                enabled: true,
                gop_length: 8,
                layer_weights: [800, 400, 400, 400],
                entries: TSVC4_ENTRIES.to_vec(),
                lt_ref_interval: 0,
                max_lt_ref_slots: 2,
            },
        }
    }

    /// Number of frames applied before the cursor wraps (`gop_length + 1`).
    pub fn cycle_len(&self) -> usize {
        self.entries.len()
    }

    /// Entry at a position within the cycle.
    pub fn entry(&self, position: usize) -> Option<&GopEntry> {
        self.entries.get(position)
    }

    /// Number of temporal layers referenced by the entries.
    pub fn num_temporal_layers(&self) -> u32 {
        self.entries
            .iter()
            .map(|e| u32::from(e.temporal_id) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Sum of all layer weights.
    ///
    /// Summed in `u64` so hand-built weights cannot overflow.
    pub fn weight_total(&self) -> u64 {
        self.layer_weights.iter().map(|&w| u64::from(w)).sum()
    }

    /// Split a target bitrate across temporal layers in proportion to the
    /// layer weights.
    ///
    /// Returns all zeros for a disabled topology.
    pub fn layer_bitrates(&self, target_bitrate: u32) -> [u32; MAX_TEMPORAL_LAYERS] {
        let total = self.weight_total();
        let mut rates = [0u32; MAX_TEMPORAL_LAYERS];
        if !self.enabled || total == 0 {
            return rates;
        }
        for (rate, &weight) in rates.iter_mut().zip(self.layer_weights.iter()) {
            // weight <= total, so the quotient fits back into u32.
            *rate = (u64::from(target_bitrate) * u64::from(weight) / total) as u32;
        }
        rates
    }

    /// Check the structural invariants of the topology.
    ///
    /// Built-in topologies always pass; this is meant for topologies built
    /// or edited by hand before they are handed to an encoder.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            if self.gop_length != 0 || !self.entries.is_empty() {
                return Err(invalid("disabled topology must not carry entries"));
            }
            return Ok(());
        }

        if self.gop_length == 0 {
            return Err(invalid("enabled topology has a zero GOP length"));
        }
        let expected = self.gop_length as usize + 1;
        if self.entries.len() != expected {
            return Err(invalid(format!(
                "expected {expected} entries for GOP length {}, found {}",
                self.gop_length,
                self.entries.len()
            )));
        }

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.temporal_id as usize >= MAX_TEMPORAL_LAYERS {
                return Err(invalid(format!(
                    "entry {index} has temporal id {} (max {})",
                    entry.temporal_id,
                    MAX_TEMPORAL_LAYERS - 1
                )));
            }
        }

        let root = &self.entries[0];
        if root.temporal_id != 0 || root.ref_parent_index != 0 || root.is_disposable {
            return Err(invalid(
                "entry 0 must be a non-disposable base-layer frame referencing itself",
            ));
        }

        let mut referenced = vec![false; self.entries.len()];
        for (index, entry) in self.entries.iter().enumerate().skip(1) {
            let parent = entry.ref_parent_index as usize;
            if parent >= index {
                return Err(invalid(format!(
                    "entry {index} references entry {parent}, which is not earlier in the cycle"
                )));
            }
            let parent_entry = &self.entries[parent];
            if parent_entry.temporal_id > entry.temporal_id {
                return Err(invalid(format!(
                    "entry {index} (temporal id {}) references higher layer entry {parent} (temporal id {})",
                    entry.temporal_id, parent_entry.temporal_id
                )));
            }
            if parent_entry.is_disposable {
                return Err(invalid(format!(
                    "entry {index} references disposable entry {parent}"
                )));
            }
            referenced[parent] = true;
        }

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.is_disposable && entry.temporal_id == 0 {
                return Err(invalid(format!(
                    "base-layer entry {index} is marked disposable"
                )));
            }
            if !entry.is_disposable && entry.temporal_id > 0 && !referenced[index] {
                return Err(invalid(format!(
                    "entry {index} is never referenced but not marked disposable"
                )));
            }
            if entry.is_long_term_ref && u32::from(entry.long_term_slot) >= self.max_lt_ref_slots {
                return Err(invalid(format!(
                    "entry {index} uses LTR slot {} but only {} slots are available",
                    entry.long_term_slot, self.max_lt_ref_slots
                )));
            }
        }

        let used_layers = self.num_temporal_layers() as usize;
        for (layer, &weight) in self.layer_weights.iter().enumerate() {
            if layer < used_layers && weight == 0 {
                return Err(invalid(format!("temporal layer {layer} has no bitrate weight")));
            }
            if layer >= used_layers && weight != 0 {
                return Err(invalid(format!(
                    "unused temporal layer {layer} has bitrate weight {weight}"
                )));
            }
        }
        if self.weight_total() != u64::from(LAYER_WEIGHT_TOTAL) {
            return Err(invalid(format!(
                "layer weights sum to {}, expected {LAYER_WEIGHT_TOTAL}",
                self.weight_total()
            )));
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> EncCfgError {
    EncCfgError::InvalidTopology(msg.into())
}

/// Derive the reference topology for a raw GOP mode selector.
///
/// Fails with [`EncCfgError::InvalidGopMode`] outside of `0..=3`. On error
/// the caller should keep applying its previous topology.
pub fn generate_topology(mode: i32) -> Result<ReferenceTopology> {
    let mode = GopMode::from_raw(mode)?;
    let topology = ReferenceTopology::for_mode(mode);
    debug!(
        "Generated {} topology: gop_length={}, weights={:?}, ltr_slots={}",
        mode, topology.gop_length, topology.layer_weights, topology.max_lt_ref_slots
    );
    Ok(topology)
}

/// Reference decision for one submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    /// Overall frame index in the sequence.
    pub frame_index: u64,
    /// Position within the GOP cycle.
    pub position: u32,
    /// Topology entry applied to this frame.
    pub entry: GopEntry,
}

impl FramePlan {
    /// Whether this frame starts a new cycle.
    pub fn is_cycle_start(&self) -> bool {
        self.position == 0
    }

    /// Whether later frames may predict from this one.
    pub fn is_reference(&self) -> bool {
        self.entry.is_reference()
    }
}

/// Walks a reference topology in frame submit order.
///
/// Owns the topology it walks, so a session can swap both together when the
/// GOP mode changes.
#[derive(Debug, Clone)]
pub struct GopCursor {
    /// Topology being applied.
    topology: ReferenceTopology,
    /// Number of frames submitted so far.
    frame_index: u64,
}

impl GopCursor {
    /// Create a cursor positioned at the first frame of a cycle.
    pub fn new(topology: ReferenceTopology) -> Self {
        Self {
            topology,
            frame_index: 0,
        }
    }

    /// Plan for the next submitted frame.
    ///
    /// Returns `None` for a disabled topology; the frame still counts as
    /// submitted.
    pub fn next_frame(&mut self) -> Option<FramePlan> {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        let cycle_len = self.topology.cycle_len() as u64;
        if !self.topology.enabled || cycle_len == 0 {
            return None;
        }
        let position = (frame_index % cycle_len) as u32;
        let entry = self.topology.entries[position as usize];

        debug!(
            "Frame {}: position {}, temporal_id {}, ref {}{}",
            frame_index,
            position,
            entry.temporal_id,
            entry.ref_parent_index,
            if entry.is_long_term_ref { ", LTR" } else { "" }
        );

        Some(FramePlan {
            frame_index,
            position,
            entry,
        })
    }

    /// The topology being walked.
    pub fn topology(&self) -> &ReferenceTopology {
        &self.topology
    }

    /// Get total frames submitted.
    pub fn total_frames(&self) -> u64 {
        self.frame_index
    }

    /// Restart from the first position of a cycle.
    pub fn reset(&mut self) {
        self.frame_index = 0;
    }
}
