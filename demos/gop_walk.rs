//! Example: walk temporal-SVC reference topologies.
//!
//! Builds a session for every GOP mode, walks two full cycles and prepares
//! an OSD overlay for each frame.

use enccfg::{EncoderSession, GopMode, OsdColor, SessionConfig, MAX_OSD_REGIONS};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

const TARGET_BITRATE: u32 = 4_000_000;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_filter(tracing_subscriber::filter::LevelFilter::INFO),
        )
        .init();

    println!("enccfg GOP walk\n");

    let colors = [
        OsdColor::from_yuva(0xeb, 0x80, 0x80, 0xff), // white
        OsdColor::from_yuva(0x10, 0x80, 0x80, 0xff), // black
        OsdColor::from_yuva(0x51, 0x5a, 0xf0, 0xff), // red
        OsdColor::from_yuva(0x91, 0x36, 0x22, 0xff), // green
        OsdColor::from_yuva(0x29, 0xf0, 0x6e, 0xff), // blue
        OsdColor::from_yuva(0xd2, 0x10, 0x92, 0xff), // yellow
        OsdColor::from_yuva(0xaa, 0xa6, 0x10, 0xff), // cyan
        OsdColor::from_yuva(0x6a, 0xca, 0xde, 0xff), // magenta
    ];
    let mut osd_buffer = vec![0u8; MAX_OSD_REGIONS as usize * 1024];

    for mode in GopMode::ALL {
        let config = SessionConfig::new()
            .with_gop_mode(mode)
            .with_target_bitrate(TARGET_BITRATE)
            .with_osd_palette(colors);
        let mut session = EncoderSession::new(config);
        session.topology().validate()?;

        println!("== {mode}: layer bitrates {:?}", session.layer_bitrates());

        let frames = (session.topology().cycle_len() * 2).max(2);
        for _ in 0..frames {
            let plan = session.next_frame();
            let overlay = session.prepare_overlay(&mut osd_buffer)?;
            match plan {
                Some(plan) => println!(
                    "  frame {:2}: pos {} tid {} ref {} {}{} osd_inverted={}",
                    plan.frame_index,
                    plan.position,
                    plan.entry.temporal_id,
                    plan.entry.ref_parent_index,
                    if plan.is_reference() { "ref" } else { "non-ref" },
                    plan.entry
                        .long_term_slot()
                        .map(|slot| format!(" ltr{slot}"))
                        .unwrap_or_default(),
                    overlay.is_inverted()
                ),
                None => println!(
                    "  frame {:2}: encoder default structure, osd_inverted={}",
                    session.frame_counter() - 1,
                    overlay.is_inverted()
                ),
            }
        }

        if let Some(palette) = session.palette() {
            println!("  palette[0]={:#010x} palette[255]={:#010x}", palette[0].0, palette[255].0);
        }
    }

    Ok(())
}
