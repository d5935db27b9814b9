//! Ambient critters.
//!
//! A single countdown spawns one critter of a random kind near the edge of
//! the village. Critters are purely cosmetic: they move by per-kind rules,
//! age, and vanish when their lifetime runs out or they stray too far.

use std::f32::consts::TAU;

use cgmath::{InnerSpace, Quaternion, Rad, Rotation3, Vector3};
use log::trace;
use rand::Rng;

use crate::{
    config::CritterConfig,
    data_structures::{
        instance::Instance,
        procedural::{self, WING},
        scene_graph::{NodeId, SceneGraph},
    },
    world::sample_range,
};

/// Seconds over which ants and landed leaves fade out.
const FADE_TIME: f32 = 2.0;
const GROUND: f32 = 0.02;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CritterKind {
    Fly,
    Bee,
    Bird,
    Ant,
    Hummingbird,
    Leaf,
}

impl CritterKind {
    pub const ALL: [CritterKind; 6] = [
        CritterKind::Fly,
        CritterKind::Bee,
        CritterKind::Bird,
        CritterKind::Ant,
        CritterKind::Hummingbird,
        CritterKind::Leaf,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CritterKind::Fly => "fly",
            CritterKind::Bee => "bee",
            CritterKind::Bird => "bird",
            CritterKind::Ant => "ant",
            CritterKind::Hummingbird => "hummingbird",
            CritterKind::Leaf => "leaf",
        }
    }

    fn lifetime(self) -> (f32, f32) {
        match self {
            CritterKind::Fly => (6.0, 12.0),
            CritterKind::Bee => (10.0, 16.0),
            CritterKind::Bird => (10.0, 18.0),
            CritterKind::Ant => (12.0, 20.0),
            CritterKind::Hummingbird => (8.0, 12.0),
            CritterKind::Leaf => (8.0, 14.0),
        }
    }

    fn cruise_speed(self) -> f32 {
        match self {
            CritterKind::Fly => 1.2,
            CritterKind::Bee => 1.5,
            CritterKind::Bird => 5.0,
            CritterKind::Ant => 0.3,
            CritterKind::Hummingbird => 3.0,
            CritterKind::Leaf => 0.5,
        }
    }

    fn spawn_height(self) -> (f32, f32) {
        match self {
            CritterKind::Fly => (1.0, 2.5),
            CritterKind::Bee => (0.8, 1.8),
            CritterKind::Bird => (8.0, 14.0),
            CritterKind::Ant => (GROUND, GROUND),
            CritterKind::Hummingbird => (1.5, 3.0),
            CritterKind::Leaf => (8.0, 12.0),
        }
    }

    /// `(amplitude, angular speed)` of the vertical bob of flyers.
    fn bob(self) -> Option<(f32, f32)> {
        match self {
            CritterKind::Bee => Some((0.25, 3.0)),
            CritterKind::Bird => Some((0.6, 1.5)),
            CritterKind::Hummingbird => Some((0.15, 6.0)),
            _ => None,
        }
    }

    /// Wing beat factor `k` in `sin(lifetime * k)`.
    fn flap_rate(self) -> Option<f32> {
        match self {
            CritterKind::Fly => Some(80.0),
            CritterKind::Bee => Some(40.0),
            CritterKind::Bird => Some(12.0),
            CritterKind::Hummingbird => Some(60.0),
            CritterKind::Ant | CritterKind::Leaf => None,
        }
    }
}

/// Kinematic state of one critter, advanced by [`advance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub base_height: f32,
    pub lifetime: f32,
    pub max_lifetime: f32,
    pub spin: f32,
    pub opacity: f32,
    pub landed: bool,
}

/// Moves `motion` by one step. `jitter` is a random unit-ish vector used by
/// the erratic flyers.
pub fn advance(kind: CritterKind, motion: &mut Motion, dt: f32, jitter: Vector3<f32>) {
    motion.lifetime -= dt;
    match kind {
        CritterKind::Fly => {
            motion.velocity += jitter * (6.0 * dt);
            let speed = motion.velocity.magnitude();
            let max = kind.cruise_speed() * 1.5;
            if speed > max {
                motion.velocity *= max / speed;
            }
            motion.position += motion.velocity * dt;
            motion.position.y = motion.position.y.clamp(0.3, 3.0);
        }
        CritterKind::Bee | CritterKind::Bird | CritterKind::Hummingbird => {
            motion.position.x += motion.velocity.x * dt;
            motion.position.z += motion.velocity.z * dt;
            if let Some((amplitude, speed)) = kind.bob() {
                motion.position.y = motion.base_height + amplitude * (motion.lifetime * speed).sin();
            }
        }
        CritterKind::Leaf => {
            if !motion.landed {
                motion.position += motion.velocity * dt;
                motion.spin += 2.0 * dt;
                if motion.position.y <= GROUND {
                    motion.position.y = GROUND;
                    motion.velocity = Vector3::new(0.0, 0.0, 0.0);
                    motion.landed = true;
                    motion.lifetime = motion.lifetime.min(FADE_TIME);
                }
            }
            if motion.landed {
                motion.opacity = (motion.lifetime / FADE_TIME).clamp(0.0, 1.0);
            }
        }
        CritterKind::Ant => {
            motion.position.x += motion.velocity.x * dt;
            motion.position.z += motion.velocity.z * dt;
            motion.position.y = GROUND;
            motion.opacity = (motion.lifetime / FADE_TIME).clamp(0.0, 1.0);
        }
    }
}

#[derive(Debug)]
pub struct Critter {
    pub kind: CritterKind,
    pub root: NodeId,
    pub motion: Motion,
    wings: Vec<NodeId>,
}

impl Critter {
    pub fn lifetime(&self) -> f32 {
        self.motion.lifetime
    }

    pub fn max_lifetime(&self) -> f32 {
        self.motion.max_lifetime
    }

    fn sync(&self, graph: &mut SceneGraph) {
        let m = &self.motion;
        let heading = m.velocity.x.atan2(m.velocity.z);
        let mut local = Instance::from(m.position).with_yaw(if m.landed { m.spin } else { heading });
        if self.kind == CritterKind::Leaf {
            local.rotation = Quaternion::from_angle_y(Rad(m.spin)) * Quaternion::from_angle_x(Rad(m.spin * 0.7));
        }
        graph.set_local(self.root, local);

        if let Some(rate) = self.kind.flap_rate() {
            let angle = (m.lifetime * rate).sin() * 0.8;
            for (i, wing) in self.wings.iter().enumerate() {
                let side = if i % 2 == 0 { 1.0 } else { -1.0 };
                if let Some(node) = graph.get_mut(*wing) {
                    node.local.rotation = Quaternion::from_angle_z(Rad(angle * side));
                }
            }
        }

        if m.opacity < 1.0 {
            for node in graph.descendants(self.root) {
                if let Some(node) = graph.get_mut(node) {
                    node.material.opacity = m.opacity;
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct CritterSpawner {
    config: CritterConfig,
    world_radius: f32,
    countdown: f32,
    critters: Vec<Critter>,
}

impl CritterSpawner {
    pub fn new(config: CritterConfig, world_radius: f32, rng: &mut impl Rng) -> Self {
        let countdown = sample_range(rng, config.spawn_interval);
        Self {
            config,
            world_radius,
            countdown,
            critters: Vec::new(),
        }
    }

    pub fn critters(&self) -> &[Critter] {
        &self.critters
    }

    /// Seconds until the next spawn.
    pub fn countdown(&self) -> f32 {
        self.countdown
    }

    pub fn update(&mut self, dt: f32, graph: &mut SceneGraph, rng: &mut impl Rng) {
        if self.config.enabled {
            self.countdown -= dt;
            if self.countdown <= 0.0 {
                let kind = CritterKind::ALL[rng.random_range(0..CritterKind::ALL.len())];
                self.spawn(kind, graph, rng);
                self.countdown = sample_range(rng, self.config.spawn_interval);
            }
        }

        let limit = self.world_radius * 2.0;
        self.critters.retain_mut(|critter| {
            let jitter = Vector3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            advance(critter.kind, &mut critter.motion, dt, jitter);
            let p = critter.motion.position;
            let runaway = p.x.hypot(p.z) > limit;
            if critter.motion.lifetime <= 0.0 || runaway {
                trace!("Despawning {} (runaway: {})", critter.kind.name(), runaway);
                graph.remove(critter.root);
                return false;
            }
            critter.sync(graph);
            true
        });
    }

    /// Spawns one critter of `kind` at the edge of the village heading inwards.
    pub fn spawn(&mut self, kind: CritterKind, graph: &mut SceneGraph, rng: &mut impl Rng) -> Option<&Critter> {
        let angle = rng.random_range(0.0..TAU);
        let edge = self.world_radius * self.config.edge_fraction;
        let (low, high) = kind.spawn_height();
        let height = sample_range(rng, [low, high]);
        let position = Vector3::new(angle.cos() * edge, height, angle.sin() * edge);
        let heading = angle + std::f32::consts::PI + rng.random_range(-0.6..0.6);
        let speed = kind.cruise_speed();
        let mut velocity = Vector3::new(heading.cos() * speed, 0.0, heading.sin() * speed);
        if kind == CritterKind::Leaf {
            velocity.y = -rng.random_range(0.6..1.0);
        }
        let (min_life, max_life) = kind.lifetime();
        let lifetime = rng.random_range(min_life..max_life);

        let root = procedural::critter(kind)
            .with_local(Instance::from(position))
            .attach(graph, None)?;
        let wings = graph
            .get(root)
            .map(|node| {
                node.children()
                    .iter()
                    .copied()
                    .filter(|child| graph.get(*child).is_some_and(|c| c.name == WING))
                    .collect()
            })
            .unwrap_or_default();
        self.critters.push(Critter {
            kind,
            root,
            motion: Motion {
                position,
                velocity,
                base_height: height,
                lifetime,
                max_lifetime: lifetime,
                spin: 0.0,
                opacity: 1.0,
                landed: false,
            },
            wings,
        });
        self.critters.last()
    }

    pub fn clear(&mut self, graph: &mut SceneGraph) {
        for critter in self.critters.drain(..) {
            graph.remove(critter.root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn motion(y: f32, velocity: Vector3<f32>, lifetime: f32) -> Motion {
        Motion {
            position: Vector3::new(0.0, y, 0.0),
            velocity,
            base_height: y,
            lifetime,
            max_lifetime: lifetime,
            spin: 0.0,
            opacity: 1.0,
            landed: false,
        }
    }

    #[test]
    fn leaf_lands_and_fades() {
        let mut leaf = motion(1.0, Vector3::new(0.2, -1.0, 0.0), 10.0);
        let mut landed_at = None;
        for frame in 0..200 {
            advance(CritterKind::Leaf, &mut leaf, 0.05, Vector3::new(0.0, 0.0, 0.0));
            if leaf.landed && landed_at.is_none() {
                landed_at = Some(frame);
                assert!(leaf.lifetime <= FADE_TIME);
            }
            if leaf.lifetime <= 0.0 {
                break;
            }
        }
        assert!(landed_at.is_some());
        assert_eq!(leaf.position.y, GROUND);
        assert_eq!(leaf.opacity, 0.0);
    }

    #[test]
    fn ant_fades_only_at_the_end() {
        let mut ant = motion(GROUND, Vector3::new(0.3, 0.0, 0.0), 5.0);
        advance(CritterKind::Ant, &mut ant, 1.0, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(ant.opacity, 1.0);
        advance(CritterKind::Ant, &mut ant, 3.0, Vector3::new(0.0, 0.0, 0.0));
        assert!((ant.opacity - 0.5).abs() < 1e-5);
        assert!((ant.position.x - 1.2).abs() < 1e-5);
    }

    #[test]
    fn bee_bobs_around_base_height() {
        let mut bee = motion(1.0, Vector3::new(1.5, 0.0, 0.0), 12.0);
        for _ in 0..100 {
            advance(CritterKind::Bee, &mut bee, 0.05, Vector3::new(0.0, 0.0, 0.0));
            assert!((bee.position.y - 1.0).abs() <= 0.25 + 1e-5);
        }
    }

    #[test]
    fn fly_wanders_within_speed_and_height_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut fly = motion(1.5, Vector3::new(1.2, 0.0, 0.0), 12.0);
        let max_speed = CritterKind::Fly.cruise_speed() * 1.5;
        let start = fly.velocity;
        let mut turned = false;
        for _ in 0..400 {
            let jitter = Vector3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            advance(CritterKind::Fly, &mut fly, 1.0 / 30.0, jitter);
            assert!(fly.velocity.magnitude() <= max_speed + 1e-4);
            assert!((0.3..=3.0).contains(&fly.position.y));
            turned |= fly.velocity.normalize().dot(start.normalize()) < 0.9;
        }
        assert!(turned);
    }

    #[test]
    fn critters_expire_and_are_removed() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut graph = SceneGraph::new();
        let mut spawner = CritterSpawner::new(CritterConfig { enabled: false, ..Default::default() }, 60.0, &mut rng);
        spawner.spawn(CritterKind::Bird, &mut graph, &mut rng).unwrap();
        assert_eq!(spawner.critters().len(), 1);
        assert!(!graph.is_empty());
        for _ in 0..(20 * 10) {
            spawner.update(0.1, &mut graph, &mut rng);
        }
        assert!(spawner.critters().is_empty());
        assert!(graph.is_empty());
    }

    #[test]
    fn runaway_critter_is_forced_out() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut graph = SceneGraph::new();
        let mut spawner = CritterSpawner::new(CritterConfig { enabled: false, ..Default::default() }, 10.0, &mut rng);
        spawner.spawn(CritterKind::Bird, &mut graph, &mut rng).unwrap();
        spawner.critters[0].motion.position = Vector3::new(25.0, 10.0, 0.0);
        spawner.update(0.01, &mut graph, &mut rng);
        assert!(spawner.critters().is_empty());
    }

    #[test]
    fn countdown_spawns_and_rearms() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut graph = SceneGraph::new();
        let mut spawner = CritterSpawner::new(CritterConfig::default(), 60.0, &mut rng);
        let first = spawner.countdown();
        assert!((3.0..8.0).contains(&first));
        spawner.update(first + 0.01, &mut graph, &mut rng);
        assert_eq!(spawner.critters().len(), 1);
        assert!((3.0..8.0).contains(&spawner.countdown()));
    }
}
