//! Renders one chaos → clarity cycle to a PNG sequence.
//!
//! Run with: RUST_LOG=debug cargo run -p rhizome-resin-flow-raster --example flow_frames [out_dir]

use std::error::Error;
use std::path::PathBuf;

use rhizome_resin_flow::{EngineConfig, FlowEngine, Phase};
use rhizome_resin_flow_raster::RasterSurface;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const FPS: f64 = 30.0;
/// Time spent disordered before activating.
const DWELL_MS: f64 = 1500.0;
/// Time spent settled before stopping.
const HOLD_MS: f64 = 2000.0;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("flow_frames"));

    let config = EngineConfig::new(WIDTH as f32, HEIGHT as f32).with_particle_count(120);
    let mut engine = FlowEngine::new(config)?;
    engine.on_phase_change(|change| {
        println!("{:>8.0}ms  {}", change.at_ms.unwrap_or(0.0), change.to.label());
    });

    let mut surface = RasterSurface::new(WIDTH, HEIGHT);
    let frame_ms = 1000.0 / FPS;
    let mut settled_at = None;
    let mut frame = 0u32;

    loop {
        let now = f64::from(frame) * frame_ms;
        if now >= DWELL_MS && engine.phase() == Phase::Disordered {
            engine.activate();
        }

        let report = engine.tick(now, &mut surface);
        if report.drawn.is_some() {
            surface.save_png(out_dir.join(format!("frame_{frame:04}.png")))?;
        }

        if report.phase == Phase::Settled && settled_at.is_none() {
            settled_at = Some(now);
        }
        if settled_at.is_some_and(|t| now - t >= HOLD_MS) {
            break;
        }
        frame += 1;
    }

    println!("wrote {} frames to {}", frame + 1, out_dir.display());
    Ok(())
}
