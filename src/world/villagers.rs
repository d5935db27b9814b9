//! Wandering villagers.
//!
//! Each villager is a two-state steering agent. `Idle` counts down a wait;
//! when it runs out the villager samples a target in the annulus around the
//! village centre. `Walk` moves straight towards the target at the villager's
//! own speed and returns to `Idle` on arrival or when the next step would
//! overlap something.

use std::{f32::consts::TAU, sync::Arc};

use log::{debug, info, warn};
use rand::Rng;

use crate::{
    config::VillagerConfig,
    data_structures::{
        instance::Instance,
        model::Model,
        procedural,
        scene_graph::{Node, NodeId, SceneGraph},
    },
    error::SimError,
    placement::PlacementValidator,
    resources::animation::{AnimationMixer, ClipHandle},
    world::sample_range,
};

/// Height villager models are normalised to.
const VILLAGER_HEIGHT: f32 = 1.7;

/// The walk target only exists while walking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VillagerState {
    Idle { wait: f32 },
    Walk { target: (f32, f32) },
}

#[derive(Debug)]
pub struct Villager {
    pub root: NodeId,
    pub position: (f32, f32),
    pub yaw: f32,
    pub state: VillagerState,
    /// Individual multiplier on the base speed.
    pub speed: f32,
    pub radius: f32,
    pub mixer: AnimationMixer,
    idle_clip: Option<ClipHandle>,
    walk_clip: Option<ClipHandle>,
}

impl Villager {
    pub fn new(root: NodeId, position: (f32, f32), speed: f32, radius: f32, wait: f32, mixer: AnimationMixer) -> Self {
        let (idle_clip, walk_clip) = mixer.idle_and_walk();
        let mut villager = Self {
            root,
            position,
            yaw: 0.0,
            state: VillagerState::Idle { wait },
            speed,
            radius,
            mixer,
            idle_clip,
            walk_clip,
        };
        if let Some(idle) = villager.idle_clip {
            villager.mixer.play(idle);
        }
        villager
    }

    pub fn target(&self) -> Option<(f32, f32)> {
        match self.state {
            VillagerState::Walk { target } => Some(target),
            VillagerState::Idle { .. } => None,
        }
    }

    pub fn is_walking(&self) -> bool {
        matches!(self.state, VillagerState::Walk { .. })
    }

    /// Starts walking to `target`. A non-finite target is rejected and the
    /// villager is forced back to idle with `retry_wait`.
    pub fn begin_walk(&mut self, target: (f32, f32), fade: f32, retry_wait: f32) -> Result<(), SimError> {
        if !(target.0.is_finite() && target.1.is_finite()) {
            self.state = VillagerState::Idle { wait: retry_wait };
            return Err(SimError::InvalidTransition(format!(
                "walk requested towards ({}, {})",
                target.0, target.1
            )));
        }
        self.state = VillagerState::Walk { target };
        if let Some(walk) = self.walk_clip {
            self.mixer.set_time_scale(walk, self.speed);
            self.mixer.cross_fade_to(walk, fade);
        }
        Ok(())
    }

    fn go_idle(&mut self, wait: f32, fade: f32) {
        self.state = VillagerState::Idle { wait };
        if let Some(idle) = self.idle_clip {
            self.mixer.cross_fade_to(idle, fade);
        }
    }

    fn transform(&self) -> Instance {
        Instance::at(self.position.0, 0.0, self.position.1).with_yaw(self.yaw)
    }
}

#[derive(Debug)]
pub struct VillagerAi {
    config: VillagerConfig,
    center: (f32, f32),
    villagers: Vec<Villager>,
}

impl VillagerAi {
    pub fn new(config: VillagerConfig, center: (f32, f32)) -> Self {
        Self {
            config,
            center,
            villagers: Vec::new(),
        }
    }

    pub fn villagers(&self) -> &[Villager] {
        &self.villagers
    }

    pub fn config(&self) -> &VillagerConfig {
        &self.config
    }

    /// Despawns every villager and stops their animations.
    pub fn clear(&mut self, graph: &mut SceneGraph) {
        for mut villager in self.villagers.drain(..) {
            villager.mixer.stop_all();
            graph.remove(villager.root);
        }
    }

    /// Replaces the roster. `variants` are the loaded looks; with none the
    /// villagers use the procedural stand-in.
    pub fn rebuild(
        &mut self,
        variants: &[Arc<Model>],
        graph: &mut SceneGraph,
        validator: &PlacementValidator,
        rng: &mut impl Rng,
    ) {
        self.clear(graph);
        let config = &self.config;
        let mut occupied: Vec<(f32, f32)> = Vec::with_capacity(config.count);
        for n in 0..config.count {
            let spot = (0..config.spawn_attempts)
                .map(|_| annulus_point(rng, self.center, config.inner_radius, config.outer_radius))
                .find(|&(x, z)| {
                    validator.is_free_for_villager(x, z, config.radius, &occupied, config.buffer)
                });
            let Some(position) = spot else {
                warn!("No free spawn point for villager {} after {} attempts", n, config.spawn_attempts);
                continue;
            };
            let root = graph.add_root(
                Node::new(format!("villager {n}"))
                    .with_local(Instance::at(position.0, 0.0, position.1)),
            );
            let mixer = if variants.is_empty() {
                procedural::villager().attach(graph, Some(root));
                AnimationMixer::default()
            } else {
                let model = &variants[rng.random_range(0..variants.len())];
                let fit = model.fit_to_height(VILLAGER_HEIGHT, 0.0);
                graph.insert(Node::model("villager model", Arc::clone(model)).with_local(fit), Some(root));
                AnimationMixer::new(&model.clips)
            };
            let speed = sample_range(rng, config.speed_multiplier);
            let wait = sample_range(rng, config.idle_wait);
            occupied.push(position);
            self.villagers
                .push(Villager::new(root, position, speed, config.radius, wait, mixer));
        }
        info!("Spawned {} villagers", self.villagers.len());
    }

    /// Advances every villager by `dt` seconds.
    pub fn update(
        &mut self,
        dt: f32,
        graph: &mut SceneGraph,
        validator: &PlacementValidator,
        rng: &mut impl Rng,
    ) {
        let mut positions: Vec<(f32, f32)> = self.villagers.iter().map(|v| v.position).collect();
        for (index, villager) in self.villagers.iter_mut().enumerate() {
            let others: Vec<(f32, f32)> = positions
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .map(|(_, p)| *p)
                .collect();
            step(&self.config, self.center, villager, dt, validator, &others, rng);
            villager.mixer.update(dt);
            positions[index] = villager.position;
            graph.set_local(villager.root, villager.transform());
        }
    }
}

fn annulus_point(rng: &mut impl Rng, center: (f32, f32), inner: f32, outer: f32) -> (f32, f32) {
    let angle = rng.random_range(0.0..TAU);
    let (lo, hi) = (inner * inner, outer * outer);
    let radius = if hi > lo { rng.random_range(lo..hi).sqrt() } else { inner };
    (center.0 + angle.cos() * radius, center.1 + angle.sin() * radius)
}

/// Picks a free point in the annulus at a walkable distance from `from`.
pub fn choose_target(
    config: &VillagerConfig,
    center: (f32, f32),
    from: (f32, f32),
    validator: &PlacementValidator,
    others: &[(f32, f32)],
    rng: &mut impl Rng,
) -> Option<(f32, f32)> {
    let [min_distance, max_distance] = config.target_distance;
    (0..config.target_attempts)
        .map(|_| annulus_point(rng, center, config.inner_radius, config.outer_radius))
        .find(|&(x, z)| {
            let distance = (x - from.0).hypot(z - from.1);
            (min_distance..=max_distance).contains(&distance)
                && validator.is_free_for_villager(x, z, config.radius, others, config.buffer)
        })
}

fn step(
    config: &VillagerConfig,
    center: (f32, f32),
    villager: &mut Villager,
    dt: f32,
    validator: &PlacementValidator,
    others: &[(f32, f32)],
    rng: &mut impl Rng,
) {
    match villager.state {
        VillagerState::Idle { wait } => {
            let wait = wait - dt;
            if wait > 0.0 {
                villager.state = VillagerState::Idle { wait };
                return;
            }
            match choose_target(config, center, villager.position, validator, others, rng) {
                Some(target) => {
                    if let Err(err) = villager.begin_walk(target, config.walk_fade, config.retry_wait) {
                        warn!("{}", err);
                    }
                }
                None => {
                    debug!("No walk target found, retrying in {}s", config.retry_wait);
                    villager.state = VillagerState::Idle {
                        wait: config.retry_wait,
                    };
                }
            }
        }
        VillagerState::Walk { target } => {
            let (dx, dz) = (target.0 - villager.position.0, target.1 - villager.position.1);
            let remaining = dx.hypot(dz);
            if remaining < config.arrival_threshold {
                villager.go_idle(sample_range(rng, config.arrival_wait), config.idle_fade);
                return;
            }
            let (dir_x, dir_z) = (dx / remaining, dz / remaining);
            let travel = remaining.min(config.base_speed * villager.speed * dt);
            let next = (
                villager.position.0 + dir_x * travel,
                villager.position.1 + dir_z * travel,
            );
            if !validator.is_free_for_villager(next.0, next.1, villager.radius, others, config.buffer) {
                villager.go_idle(sample_range(rng, config.arrival_wait), config.idle_fade);
                return;
            }
            villager.position = next;
            villager.yaw = dir_x.atan2(dir_z);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::model::{Aabb, ClipInfo};
    use crate::placement::{CollisionZone, ZoneKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn lone_villager(graph: &mut SceneGraph) -> Villager {
        let root = graph.add_root(Node::new("villager"));
        let model = Model::new("villager", Aabb::grounded(1.0, 1.7, 1.0)).with_clips(vec![
            ClipInfo { name: "Idle".into(), duration: 2.0 },
            ClipInfo { name: "Walk".into(), duration: 1.0 },
        ]);
        Villager::new(root, (0.0, 10.0), 1.0, 0.5, 0.0, AnimationMixer::new(&model.clips))
    }

    #[test]
    fn reaches_target_in_bounded_steps() {
        let config = VillagerConfig::default();
        let validator = PlacementValidator::new();
        let mut graph = SceneGraph::new();
        let mut villager = lone_villager(&mut graph);
        villager.begin_walk((8.0, 16.0), 0.35, 0.5).unwrap();

        let dt = 1.0 / 60.0;
        let distance = 10.0f32;
        let bound = (distance / (config.base_speed * villager.speed * dt)).ceil() as usize + 2;
        let mut rng = rng();
        let mut steps = 0;
        while villager.is_walking() {
            step(&config, (0.0, 0.0), &mut villager, dt, &validator, &[], &mut rng);
            steps += 1;
            assert!(steps <= bound, "villager did not arrive within {bound} steps");
        }
        assert!((villager.position.0 - 8.0).hypot(villager.position.1 - 16.0) < config.arrival_threshold);
        assert!(villager.target().is_none());
    }

    #[test]
    fn walk_faces_movement_direction() {
        let config = VillagerConfig::default();
        let mut graph = SceneGraph::new();
        let mut villager = lone_villager(&mut graph);
        villager.begin_walk((5.0, 10.0), 0.35, 0.5).unwrap();
        step(&config, (0.0, 0.0), &mut villager, 0.1, &PlacementValidator::new(), &[], &mut rng());
        assert!((villager.yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn blocked_step_aborts_walk() {
        let config = VillagerConfig::default();
        let mut validator = PlacementValidator::new();
        validator.register_zone(CollisionZone::new(0.0, 11.5, 0.9, ZoneKind::Building));
        let mut graph = SceneGraph::new();
        let mut villager = lone_villager(&mut graph);
        villager.begin_walk((0.0, 20.0), 0.35, 0.5).unwrap();
        let mut rng = rng();
        for _ in 0..60 {
            step(&config, (0.0, 0.0), &mut villager, 1.0 / 30.0, &validator, &[], &mut rng);
            if !villager.is_walking() {
                break;
            }
        }
        assert!(!villager.is_walking());
        assert!(villager.position.1 < 10.1);
    }

    #[test]
    fn idle_without_free_target_rearms_retry_wait() {
        let config = VillagerConfig::default();
        let mut validator = PlacementValidator::new();
        validator.register_zone(CollisionZone::new(0.0, 0.0, config.outer_radius + 5.0, ZoneKind::VillageCenter));
        let mut graph = SceneGraph::new();
        let mut villager = lone_villager(&mut graph);
        let mut rng = rng();

        step(&config, (0.0, 0.0), &mut villager, 0.1, &validator, &[], &mut rng);
        assert_eq!(villager.state, VillagerState::Idle { wait: config.retry_wait });
        assert_eq!(villager.position, (0.0, 10.0));

        step(&config, (0.0, 0.0), &mut villager, 0.1, &validator, &[], &mut rng);
        match villager.state {
            VillagerState::Idle { wait } => assert!((wait - (config.retry_wait - 0.1)).abs() < 1e-5),
            VillagerState::Walk { .. } => panic!("walked with no free target"),
        }
    }

    #[test]
    fn non_finite_target_is_an_invalid_transition() {
        let mut graph = SceneGraph::new();
        let mut villager = lone_villager(&mut graph);
        let err = villager.begin_walk((f32::NAN, 0.0), 0.35, 0.5).unwrap_err();
        assert!(matches!(err, SimError::InvalidTransition(_)));
        assert_eq!(villager.state, VillagerState::Idle { wait: 0.5 });
    }

    #[test]
    fn chosen_targets_respect_distance_band() {
        let config = VillagerConfig::default();
        let validator = PlacementValidator::new();
        let mut rng = rng();
        for _ in 0..50 {
            if let Some((x, z)) = choose_target(&config, (0.0, 0.0), (0.0, 15.0), &validator, &[], &mut rng) {
                let distance = x.hypot(z - 15.0);
                assert!((2.0..=12.0).contains(&distance));
                let from_center = x.hypot(z);
                assert!(from_center >= config.inner_radius - 1e-3);
                assert!(from_center <= config.outer_radius + 1e-3);
            }
        }
    }

    #[test]
    fn walk_animation_rate_follows_speed() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root(Node::new("villager"));
        let clips = [
            ClipInfo { name: "Idle".into(), duration: 2.0 },
            ClipInfo { name: "Walk".into(), duration: 1.0 },
        ];
        let mut villager = Villager::new(root, (0.0, 10.0), 1.3, 0.5, 0.0, AnimationMixer::new(&clips));
        villager.begin_walk((3.0, 10.0), 0.35, 0.5).unwrap();
        let walk = villager.mixer.find("walk").unwrap();
        assert_eq!(villager.mixer.time_scale(walk), 1.3);
        assert!(villager.mixer.is_playing(walk));
    }
}
