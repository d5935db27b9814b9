//! Runs the village without a window for a few seconds.
//!
//! Models are read from `./assets`; anything missing shows its procedural
//! stand-in. Pass a JSON building layout as the first argument to replace the
//! built-in one, and a village config as the second.

use std::sync::Arc;

use anyhow::Context as _;
use village_ngin::{
    config::{BuildingConfig, BuildingVariant, VillageConfig, buildings_from_json_str},
    pick::VillageObserver,
    render::{RenderFrame, SceneRenderer},
    resources::GltfFileLoader,
    VillageSimulation, run_headless,
};

struct LogObserver;

impl VillageObserver for LogObserver {
    fn on_building_hover(&mut self, building: Option<&BuildingConfig>) {
        println!("hover: {:?}", building.map(|b| &b.label));
    }

    fn on_loading_progress(&mut self, fraction: f32) {
        println!("loading {:.0}%", fraction * 100.0);
    }

    fn on_loading_complete(&mut self) {
        println!("village ready");
    }
}

#[derive(Default)]
struct FrameStats {
    frames: u64,
}

impl SceneRenderer for FrameStats {
    fn render(&mut self, frame: &RenderFrame<'_>) {
        self.frames += 1;
        if self.frames % 60 == 0 {
            log::info!(
                "frame {}: {} opaque, {} transparent, {} lights, sky #{:06x}",
                self.frames,
                frame.opaque.len(),
                frame.transparent.len(),
                frame.lights.len(),
                frame.clear_colour.to_hex()
            );
        }
    }
}

fn default_layout() -> Vec<BuildingConfig> {
    let mut crypt = BuildingConfig::new("crypt", BuildingVariant::Dungeon, -18.0, -16.0);
    crypt.position[1] = 2.0;
    vec![
        BuildingConfig::new("home", BuildingVariant::House, 16.0, 2.0),
        BuildingConfig::new("general store", BuildingVariant::Shop, -16.0, 4.0),
        BuildingConfig::new("apothecary", BuildingVariant::Alchemy, 12.0, -14.0),
        BuildingConfig::new("chapel", BuildingVariant::Temple, 0.0, 20.0),
        BuildingConfig::new("the drowsy boar", BuildingVariant::Tavern, 2.0, -20.0),
        BuildingConfig::new("adventurers guild", BuildingVariant::Guild, -14.0, 16.0).locked(),
        crypt,
    ]
}

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let layout = match args.next() {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            buildings_from_json_str(&json)?
        }
        None => default_layout(),
    };
    let config = match args.next() {
        Some(path) => VillageConfig::from_json_file(path)?,
        None => VillageConfig::default(),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let mut sim = VillageSimulation::new(
        config,
        Arc::new(GltfFileLoader::default()),
        runtime.handle().clone(),
    )
    .with_observer(Box::new(LogObserver))
    .with_renderer(Box::new(FrameStats::default()));

    sim.apply_buildings(layout);
    runtime.block_on(sim.wait_for_loads());
    for (building, anchor) in sim.buildings().label_positions() {
        if let Some((x, y)) = sim.context().world_to_screen(anchor) {
            println!("label {:?} at ({:.0}, {:.0})", building.label, x, y);
        }
    }
    if let Some(center) = sim.buildings().center_of(0) {
        let ctx = sim.context();
        if let Some(ndc) = village_ngin::camera::world_to_ndc(&ctx.camera, &ctx.projection, center) {
            sim.update_hover(ndc);
        }
    }

    run_headless(&mut sim, 300)?;
    sim.dispose();
    Ok(())
}
