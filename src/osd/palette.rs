//! OSD palette remapping.
//!
//! The hardware OSD colour table has 256 slots; operators supply 8 colours
//! which are replicated cyclically (`palette[slot] = table[slot % 8]`).

use std::ops::Index;

/// Number of slots in the hardware OSD palette.
pub const PALETTE_SIZE: usize = 256;

/// Number of colours in an operator-supplied OSD table.
pub const OSD_TABLE_SIZE: usize = 8;

/// Packed OSD colour value.
///
/// Layout (LSB first): `v`, `u`, `y`, `alpha`, one byte each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OsdColor(pub u32);

impl OsdColor {
    /// Pack a colour from its YUV and alpha components.
    pub const fn from_yuva(y: u8, u: u8, v: u8, alpha: u8) -> Self {
        Self(v as u32 | (u as u32) << 8 | (y as u32) << 16 | (alpha as u32) << 24)
    }

    /// Luma component.
    pub fn y(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Cb component.
    pub fn u(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Cr component.
    pub fn v(self) -> u8 {
        self.0 as u8
    }

    /// Alpha component.
    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }
}

impl From<u32> for OsdColor {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

impl From<OsdColor> for u32 {
    fn from(color: OsdColor) -> Self {
        color.0
    }
}

/// 256-entry OSD colour table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteTable {
    data: [OsdColor; PALETTE_SIZE],
}

impl Default for PaletteTable {
    fn default() -> Self {
        Self {
            data: [OsdColor::default(); PALETTE_SIZE],
        }
    }
}

impl PaletteTable {
    /// Palette slots in order.
    pub fn as_slice(&self) -> &[OsdColor] {
        &self.data
    }

    /// Colour at a slot.
    pub fn get(&self, slot: usize) -> Option<OsdColor> {
        self.data.get(slot).copied()
    }

    /// Iterate over palette slots in order.
    pub fn iter(&self) -> impl Iterator<Item = &OsdColor> {
        self.data.iter()
    }

    fn remap_from(&mut self, table: &[OsdColor; OSD_TABLE_SIZE]) {
        for (slot, color) in self.data.iter_mut().enumerate() {
            *color = table[slot % OSD_TABLE_SIZE];
        }
    }
}

impl Index<usize> for PaletteTable {
    type Output = OsdColor;

    fn index(&self, slot: usize) -> &OsdColor {
        &self.data[slot]
    }
}

/// Build the 256-entry palette from an 8-entry colour table.
pub fn generate_palette(table: &[OsdColor; OSD_TABLE_SIZE]) -> PaletteTable {
    let mut palette = PaletteTable::default();
    palette.remap_from(table);
    palette
}

/// Remap `table` into `dest` in place.
///
/// If either side is absent nothing is written and `false` is returned.
pub fn fill_palette(
    dest: Option<&mut PaletteTable>,
    table: Option<&[OsdColor; OSD_TABLE_SIZE]>,
) -> bool {
    match (dest, table) {
        (Some(dest), Some(table)) => {
            dest.remap_from(table);
            true
        }
        _ => false,
    }
}
