//! Simulation context and the frame loop.
//!
//! [`VillageSimulation`] owns every subsystem and is the only thing a host
//! talks to. Its lifecycle:
//! 1. `apply_buildings` places buildings and starts their loads
//! 2. `tick` drains finished loads, then advances villagers, critters and the
//!    environment, then hands a frame to the renderer
//! 3. Once every building settled and the villager looks arrived, scenery is
//!    placed, the villagers are rebuilt and `on_loading_complete` fires
//! 4. `dispose` tears everything down; loads still in flight become no-ops
//!
//! The frame loop never waits for a load. Hosts and tests that need a fully
//! populated village await [`VillageSimulation::wait_for_loads`].

use std::sync::Arc;

use instant::{Duration, Instant};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    config::{BuildingConfig, VillageConfig},
    context::{Context, Cursor},
    data_structures::{model::Model, scene_graph::SceneGraph},
    pick::{Interaction, NoopObserver, VillageObserver},
    placement::PlacementValidator,
    render::{NullRenderer, RenderFrame, SceneRenderer},
    resources::{ModelLoader, cache::AssetCache},
    world::{
        LoadEvent, LoadQueue,
        buildings::BuildingRegistry,
        critters::CritterSpawner,
        environment::{DayNightSource, Environment, WallClockDayNight, Weather},
        scenery::ScenerySpawner,
        villagers::VillagerAi,
    },
};

/// Longest step a single frame may advance the simulation by.
pub const MAX_FRAME: Duration = Duration::from_millis(100);

pub struct VillageSimulation {
    config: VillageConfig,
    ctx: Context,
    graph: SceneGraph,
    validator: PlacementValidator,
    cache: AssetCache,
    buildings: BuildingRegistry,
    scenery: ScenerySpawner,
    villagers: VillagerAi,
    critters: CritterSpawner,
    environment: Environment,
    interaction: Interaction,
    observer: Box<dyn VillageObserver>,
    renderer: Box<dyn SceneRenderer>,
    rng: ChaCha8Rng,
    loads: LoadQueue,
    villager_variants: Option<Vec<Arc<Model>>>,
    populated: bool,
    elapsed: f32,
    running: bool,
}

impl VillageSimulation {
    /// Loads are spawned on `handle`.
    pub fn new(
        config: VillageConfig,
        loader: Arc<dyn ModelLoader>,
        handle: tokio::runtime::Handle,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.world.seed);
        let center = (config.world.center_zone.x, config.world.center_zone.z);
        let critters = CritterSpawner::new(config.critters.clone(), config.world.radius, &mut rng);
        let weather = Weather::new(config.weather.clone(), &mut rng);
        let mut validator = PlacementValidator::new();
        let mut graph = SceneGraph::new();
        let mut buildings = BuildingRegistry::new();
        buildings.clear(&mut graph, &mut validator, &config.world.center_zone);
        Self {
            ctx: Context::default(),
            graph,
            validator,
            cache: AssetCache::new(loader),
            buildings,
            scenery: ScenerySpawner::new(config.scenery.layouts.clone()),
            villagers: VillagerAi::new(config.villagers.clone(), center),
            critters,
            environment: Environment::new(Box::new(WallClockDayNight::default()), weather),
            interaction: Interaction::new(),
            observer: Box::new(NoopObserver),
            renderer: Box::new(NullRenderer),
            rng,
            loads: LoadQueue::new(handle),
            villager_variants: None,
            populated: false,
            elapsed: 0.0,
            running: true,
            config,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn VillageObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn SceneRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_day_night(mut self, source: Box<dyn DayNightSource>) -> Self {
        self.environment.set_source(source);
        self
    }

    /// Replaces the whole building set. Previous buildings, scenery and
    /// villagers are removed right away; results of their loads are ignored.
    pub fn apply_buildings(&mut self, configs: Vec<BuildingConfig>) {
        let epoch = self.loads.bump_epoch();
        debug!("Applying buildings under epoch {}", epoch);
        self.reset_hover();
        self.villagers.clear(&mut self.graph);
        self.scenery.clear(&mut self.graph);
        self.buildings
            .clear(&mut self.graph, &mut self.validator, &self.config.world.center_zone);
        self.villager_variants = None;
        self.populated = false;
        self.running = true;

        self.buildings.apply(
            configs,
            &mut self.graph,
            &mut self.validator,
            &mut self.loads,
            &self.cache,
            &self.config.catalog,
        );
        if self.buildings.progress().total == 0 {
            self.observer.on_loading_progress(1.0);
        }
        self.spawn_villager_looks();
    }

    fn spawn_villager_looks(&mut self) {
        let looks: Vec<_> = self
            .config
            .catalog
            .villagers
            .iter()
            .map(|urls| self.cache.load_first_available(urls))
            .collect();
        self.loads.spawn(async move {
            LoadEvent::VillagerVariants {
                results: futures::future::join_all(looks).await,
            }
        });
    }

    /// Applies every finished load without waiting.
    pub fn pump_loads(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.loads.try_next() {
            self.handle_event(event);
            applied += 1;
        }
        applied
    }

    /// Waits until every load of the current building set has settled,
    /// including the scenery loads started once it is populated.
    pub async fn wait_for_loads(&mut self) {
        while let Some(event) = self.loads.next().await {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Variant { variant, result } => {
                let progress = self.buildings.on_variant_loaded(variant, result, &mut self.graph);
                self.observer.on_loading_progress(progress.fraction());
            }
            LoadEvent::Scenery { category, result } => {
                self.scenery.on_asset_loaded(category, result, &mut self.graph);
            }
            LoadEvent::VillagerVariants { results } => {
                let mut looks = Vec::with_capacity(results.len());
                for result in results {
                    match result {
                        Ok(model) => looks.push(model),
                        Err(err) => warn!("Villager look unavailable: {}", err),
                    }
                }
                self.villager_variants = Some(looks);
            }
        }
        self.populate_when_settled();
    }

    fn populate_when_settled(&mut self) {
        if self.populated || !self.buildings.is_settled() {
            return;
        }
        let Some(looks) = self.villager_variants.as_deref() else {
            return;
        };
        self.populated = true;
        self.scenery
            .decorate(&mut self.graph, &mut self.validator, &mut self.loads, &self.cache);
        self.villagers
            .rebuild(looks, &mut self.graph, &self.validator, &mut self.rng);
        info!(
            "Village populated: {} buildings, {} villagers",
            self.buildings.len(),
            self.villagers.villagers().len()
        );
        self.observer.on_loading_complete();
    }

    /// Advances the simulation by `dt` and renders one frame.
    pub fn tick(&mut self, dt: Duration) {
        if !self.running {
            return;
        }
        self.pump_loads();
        let dt = dt.as_secs_f32();
        self.elapsed += dt;

        self.villagers
            .update(dt, &mut self.graph, &self.validator, &mut self.rng);
        self.critters.update(dt, &mut self.graph, &mut self.rng);
        self.environment.update(dt, &mut self.graph, &mut self.rng);
        self.buildings.update_float(
            &mut self.graph,
            self.elapsed,
            self.config.world.float_amplitude,
            self.config.world.float_speed,
        );

        let lighting = *self.environment.lighting();
        self.ctx.clear_colour = lighting.sky_color;
        let frame = RenderFrame::collect(&self.graph, &self.ctx, lighting, self.buildings.lights());
        self.renderer.render(&frame);
    }

    /// Moves the pointer (in NDC) and updates the hovered building.
    pub fn update_hover(&mut self, ndc: (f32, f32)) -> Option<usize> {
        self.interaction.update_hover(
            ndc,
            &mut self.ctx,
            &mut self.graph,
            &mut self.buildings,
            self.observer.as_mut(),
        )
    }

    /// Clicks at the current pointer position.
    pub fn handle_click(&mut self) -> bool {
        self.interaction
            .handle_click(&self.ctx, &self.graph, &self.buildings, self.observer.as_mut())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    fn reset_hover(&mut self) {
        if let Some(index) = self.interaction.hovered() {
            self.buildings.set_hovered(index, false, &mut self.graph);
        }
        self.interaction.reset();
        self.ctx.cursor = Cursor::Default;
    }

    /// Stops the frame loop and frees the whole scene. Safe while loads are
    /// in flight.
    pub fn dispose(&mut self) {
        self.loads.bump_epoch();
        self.reset_hover();
        self.running = false;
        self.villagers.clear(&mut self.graph);
        self.critters.clear(&mut self.graph);
        self.environment.weather.clear(&mut self.graph, &mut self.rng);
        self.scenery.clear(&mut self.graph);
        self.buildings
            .clear(&mut self.graph, &mut self.validator, &self.config.world.center_zone);
        self.validator.clear_zones();
        self.graph.clear();
        self.villager_variants = None;
        self.populated = false;
        info!("Village disposed");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Loading finished and the village was populated for the current set.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn pending_loads(&self) -> usize {
        self.loads.pending()
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn config(&self) -> &VillageConfig {
        &self.config
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn validator(&self) -> &PlacementValidator {
        &self.validator
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub fn buildings(&self) -> &BuildingRegistry {
        &self.buildings
    }

    pub fn scenery(&self) -> &ScenerySpawner {
        &self.scenery
    }

    pub fn villagers(&self) -> &VillagerAi {
        &self.villagers
    }

    pub fn critters(&self) -> &CritterSpawner {
        &self.critters
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn hovered(&self) -> Option<usize> {
        self.interaction.hovered()
    }
}

impl std::fmt::Debug for VillageSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VillageSimulation")
            .field("nodes", &self.graph.len())
            .field("buildings", &self.buildings.len())
            .field("villagers", &self.villagers.villagers().len())
            .field("critters", &self.critters.critters().len())
            .field("pending_loads", &self.loads.pending())
            .field("populated", &self.populated)
            .field("running", &self.running)
            .finish()
    }
}

/// Measures wall-clock time between frames.
#[derive(Debug)]
pub struct FrameDriver {
    last_time: Instant,
    frames: u64,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self {
            last_time: Instant::now(),
            frames: 0,
        }
    }

    /// Ticks `sim` with the time since the previous frame, clamped to
    /// [`MAX_FRAME`]. Returns the step used.
    pub fn frame(&mut self, sim: &mut VillageSimulation) -> Duration {
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        if dt > MAX_FRAME {
            debug!("Clamping a {:?} frame", dt);
        }
        let dt = dt.min(MAX_FRAME);
        sim.tick(dt);
        self.frames += 1;
        dt
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `frames` frames at roughly 60 fps without a window. Stops early once
/// the simulation is disposed.
pub fn run_headless(sim: &mut VillageSimulation, frames: u64) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };
    if !sim.is_running() {
        anyhow::bail!("cannot drive a disposed simulation");
    }

    let budget = Duration::from_millis(16);
    let mut driver = FrameDriver::new();
    while driver.frames() < frames && sim.is_running() {
        let start = Instant::now();
        driver.frame(sim);
        if let Some(rest) = budget.checked_sub(start.elapsed()) {
            std::thread::sleep(rest);
        }
    }
    info!("Headless run finished after {} frames: {:?}", driver.frames(), sim);
    Ok(())
}
