//! On-screen display (OSD) overlay regions.
//!
//! Describes the rectangular overlay regions blended into each encoded frame
//! and fills their pixel data into a caller-owned overlay buffer. Regions are
//! addressed in macroblocks and packed contiguously in the buffer, in
//! ascending index order.

pub mod palette;

use std::ops::Range;

use tracing::debug;

use crate::error::{EncCfgError, Result};

/// Size of the hardware OSD region table.
pub const MAX_OSD_REGIONS: u32 = 8;

/// Overlay bytes per macroblock.
pub const OSD_BYTES_PER_MB: u32 = 256;

/// Region extent in macroblocks (width, height).
pub const OSD_REGION_EXTENT_MB: (u32, u32) = (2, 2);

/// Bytes occupied by one region in the overlay buffer.
pub const fn region_byte_size() -> usize {
    (OSD_REGION_EXTENT_MB.0 * OSD_REGION_EXTENT_MB.1 * OSD_BYTES_PER_MB) as usize
}

/// One rectangular overlay region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayRegion {
    /// Region index (0..region_count).
    pub index: u8,
    /// Whether the region is blended.
    pub enabled: bool,
    /// Inverse-colour blending; alternates every frame.
    pub inverted_polarity: bool,
    /// Top-left corner in macroblocks (x, y).
    pub origin: (u32, u32),
    /// Size in macroblocks (width, height).
    pub extent: (u32, u32),
    /// Byte offset of this region's data in the overlay buffer.
    pub buffer_offset: u32,
}

impl OverlayRegion {
    fn new(index: u8, inverted_polarity: bool) -> Self {
        let k = u32::from(index);
        Self {
            index,
            enabled: true,
            inverted_polarity,
            origin: (k * 3, k * 2),
            extent: OSD_REGION_EXTENT_MB,
            buffer_offset: k * region_byte_size() as u32,
        }
    }

    /// Bytes this region occupies in the overlay buffer.
    pub fn byte_size(&self) -> usize {
        (self.extent.0 * self.extent.1 * OSD_BYTES_PER_MB) as usize
    }

    /// Byte range of this region in the overlay buffer.
    pub fn byte_range(&self) -> Range<usize> {
        let start = self.buffer_offset as usize;
        start..start + self.byte_size()
    }
}

/// Overlay regions for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayDescriptorSet {
    /// Number of regions.
    pub region_count: u32,
    /// Regions in ascending index order.
    pub regions: Vec<OverlayRegion>,
    /// Length of the buffer prefix holding region data.
    pub buffer_len: usize,
}

impl OverlayDescriptorSet {
    /// Whether this frame's regions use inverse-colour blending.
    pub fn is_inverted(&self) -> bool {
        self.regions.first().is_some_and(|r| r.inverted_polarity)
    }
}

/// Describe `region_count` overlay regions for a frame and fill their data
/// into `buffer`.
///
/// Region `k` is filled with the byte value `k`. Nothing is written unless
/// the whole layout fits.
pub fn generate_overlay(
    frame_counter: u64,
    buffer: &mut [u8],
    region_count: u32,
) -> Result<OverlayDescriptorSet> {
    if region_count == 0 || region_count > MAX_OSD_REGIONS {
        return Err(EncCfgError::InvalidRegionCount(region_count));
    }

    let region_size = region_byte_size();
    let required = region_count as usize * region_size;
    if buffer.len() < required {
        return Err(EncCfgError::BufferTooSmall {
            required,
            actual: buffer.len(),
        });
    }

    let inverted = frame_counter & 1 != 0;
    // region_count <= MAX_OSD_REGIONS, so indices fit in u8.
    let regions: Vec<OverlayRegion> = (0..region_count as u8)
        .map(|index| OverlayRegion::new(index, inverted))
        .collect();

    for (chunk, region) in buffer[..required]
        .chunks_exact_mut(region_size)
        .zip(regions.iter())
    {
        chunk.fill(region.index);
    }

    debug!(
        "Generated {} OSD regions for frame {} ({} bytes, inverted={})",
        region_count, frame_counter, required, inverted
    );

    Ok(OverlayDescriptorSet {
        region_count,
        regions,
        buffer_len: required,
    })
}

/// [`generate_overlay`] with the full hardware region table.
pub fn generate_default_overlay(
    frame_counter: u64,
    buffer: &mut [u8],
) -> Result<OverlayDescriptorSet> {
    generate_overlay(frame_counter, buffer, MAX_OSD_REGIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_LAYOUT: usize = 8 * 1024;

    fn checksum(buf: &[u8]) -> u64 {
        buf.iter()
            .enumerate()
            .fold(0u64, |acc, (i, &b)| acc.wrapping_mul(31).wrapping_add(b as u64 ^ i as u64))
    }

    mod geometry_tests {
        use super::*;

        #[test]
        fn test_region_geometry() {
            let mut buf = vec![0xaa; FULL_LAYOUT];
            let set = generate_default_overlay(0, &mut buf).unwrap();

            assert_eq!(set.region_count, 8);
            assert_eq!(set.regions.len(), 8);
            assert_eq!(set.buffer_len, FULL_LAYOUT);
            for (k, region) in set.regions.iter().enumerate() {
                let k32 = k as u32;
                assert_eq!(region.index as usize, k);
                assert!(region.enabled);
                assert_eq!(region.origin, (k32 * 3, k32 * 2));
                assert_eq!(region.extent, (2, 2));
                assert_eq!(region.buffer_offset, k32 * 1024);
                assert_eq!(region.byte_size(), 1024);
            }
        }

        #[test]
        fn test_regions_disjoint_and_contiguous() {
            let mut buf = vec![0; FULL_LAYOUT];
            let set = generate_default_overlay(5, &mut buf).unwrap();

            let mut next = 0;
            for region in &set.regions {
                let range = region.byte_range();
                assert_eq!(range.start, next);
                assert_eq!(range.len(), 1024);
                next = range.end;
            }
            assert_eq!(next, FULL_LAYOUT);
        }

        #[test]
        fn test_fill_pattern() {
            let mut buf = vec![0xaa; FULL_LAYOUT + 16];
            let set = generate_default_overlay(0, &mut buf).unwrap();

            for region in &set.regions {
                assert!(buf[region.byte_range()].iter().all(|&b| b == region.index));
            }
            // Bytes past the layout are left alone.
            assert!(buf[FULL_LAYOUT..].iter().all(|&b| b == 0xaa));
        }

        #[test]
        fn test_partial_region_count() {
            let mut buf = vec![0xff; 3 * 1024];
            let set = generate_overlay(0, &mut buf, 3).unwrap();
            assert_eq!(set.regions.len(), 3);
            assert_eq!(set.buffer_len, 3 * 1024);
            assert_eq!(buf[2 * 1024], 2);
        }
    }

    mod polarity_tests {
        use super::*;

        #[test]
        fn test_polarity_alternates() {
            let mut buf = vec![0; FULL_LAYOUT];
            let even = generate_default_overlay(0, &mut buf).unwrap();
            let even2 = generate_default_overlay(2, &mut buf).unwrap();
            let odd = generate_default_overlay(1, &mut buf).unwrap();

            assert_eq!(even, even2);
            assert!(!even.is_inverted());
            assert!(odd.is_inverted());
            for (a, b) in even.regions.iter().zip(odd.regions.iter()) {
                assert_ne!(a.inverted_polarity, b.inverted_polarity);
                assert_eq!(a.origin, b.origin);
                assert_eq!(a.buffer_offset, b.buffer_offset);
            }
        }

        #[test]
        fn test_idempotent() {
            let mut first = vec![0; FULL_LAYOUT];
            let mut second = vec![0x55; FULL_LAYOUT];
            let a = generate_default_overlay(7, &mut first).unwrap();
            let b = generate_default_overlay(7, &mut second).unwrap();
            assert_eq!(a, b);
            assert_eq!(first, second);
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_buffer_too_small_leaves_buffer_untouched() {
            let mut buf: Vec<u8> = (0..FULL_LAYOUT - 1).map(|i| (i * 7) as u8).collect();
            let before = checksum(&buf);

            let err = generate_default_overlay(0, &mut buf).unwrap_err();
            assert_eq!(
                err,
                EncCfgError::BufferTooSmall {
                    required: FULL_LAYOUT,
                    actual: FULL_LAYOUT - 1
                }
            );
            assert_eq!(checksum(&buf), before);
        }

        #[test]
        fn test_invalid_region_count() {
            let mut buf = vec![0x11; 16 * 1024];
            assert_eq!(
                generate_overlay(0, &mut buf, 0),
                Err(EncCfgError::InvalidRegionCount(0))
            );
            assert_eq!(
                generate_overlay(0, &mut buf, 9),
                Err(EncCfgError::InvalidRegionCount(9))
            );
            assert!(buf.iter().all(|&b| b == 0x11));
        }
    }
}
