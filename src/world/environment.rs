//! Day-night lighting and weather.
//!
//! Lighting is a pure function of a day-night blend in `[0, 1]` (0 = day,
//! 1 = night) and is recomputed every frame. Weather runs on its own
//! countdown and shares nothing with the lighting.

use std::time::{SystemTime, UNIX_EPOCH};

use cgmath::{Point3, Vector3};
use log::{debug, info};
use rand::Rng;

use crate::{
    config::WeatherConfig,
    data_structures::{
        instance::Instance,
        material::Color,
        procedural,
        scene_graph::{NodeId, SceneGraph},
    },
    world::sample_range,
};

/// Supplies the day-night blend.
pub trait DayNightSource: Send {
    fn blend(&self) -> f32;
}

/// Follows the real clock: day from 07:00 to 18:00, night from 20:00 to
/// 05:00, linear ramps in between.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClockDayNight {
    /// Hours added to UTC.
    pub utc_offset_hours: f32,
}

impl WallClockDayNight {
    pub fn blend_at_hour(hour: f32) -> f32 {
        let hour = hour.rem_euclid(24.0);
        match hour {
            h if h < 5.0 => 1.0,
            h if h < 7.0 => 1.0 - (h - 5.0) / 2.0,
            h if h < 18.0 => 0.0,
            h if h < 20.0 => (h - 18.0) / 2.0,
            _ => 1.0,
        }
    }
}

impl DayNightSource for WallClockDayNight {
    fn blend(&self) -> f32 {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let hour = (seconds / 3600.0).rem_euclid(24.0) as f32 + self.utc_offset_hours;
        Self::blend_at_hour(hour)
    }
}

/// Constant blend, for hosts that drive time themselves.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FixedDayNight(pub f32);

impl DayNightSource for FixedDayNight {
    fn blend(&self) -> f32 {
        self.0
    }
}

const AMBIENT_DAY: Color = Color::from_hex(0xfff4e0);
const AMBIENT_NIGHT: Color = Color::from_hex(0x2a3a66);
const SUN_DAY: Color = Color::from_hex(0xfff1c1);
const SUN_NIGHT: Color = Color::from_hex(0x8aa0d8);
const HEMI_SKY_DAY: Color = Color::from_hex(0x87ceeb);
const HEMI_SKY_NIGHT: Color = Color::from_hex(0x1a2340);
const HEMI_GROUND_DAY: Color = Color::from_hex(0x5d7a3a);
const HEMI_GROUND_NIGHT: Color = Color::from_hex(0x141a10);
const SKY_DAY: Color = Color::from_hex(0x87ceeb);
const SKY_NIGHT: Color = Color::from_hex(0x0b1026);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    pub ambient_intensity: f32,
    pub ambient_color: Color,
    pub sun_intensity: f32,
    pub sun_color: Color,
    pub sun_position: Point3<f32>,
    pub hemisphere_sky: Color,
    pub hemisphere_ground: Color,
    pub sky_color: Color,
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl Lighting {
    pub fn from_blend(blend: f32) -> Self {
        let t = blend.clamp(0.0, 1.0);
        Self {
            ambient_intensity: lerp(0.65, 0.2, t),
            ambient_color: AMBIENT_DAY.lerp(AMBIENT_NIGHT, t),
            sun_intensity: lerp(0.8, 0.1, t),
            sun_color: SUN_DAY.lerp(SUN_NIGHT, t),
            sun_position: Point3::new(30.0, lerp(38.0, -10.0, t), 20.0),
            hemisphere_sky: HEMI_SKY_DAY.lerp(HEMI_SKY_NIGHT, t),
            hemisphere_ground: HEMI_GROUND_DAY.lerp(HEMI_GROUND_NIGHT, t),
            sky_color: SKY_DAY.lerp(SKY_NIGHT, t),
        }
    }
}

impl Default for Lighting {
    fn default() -> Self {
        Self::from_blend(0.0)
    }
}

#[derive(Debug)]
pub struct RainDrop {
    pub node: NodeId,
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
}

#[derive(Debug)]
pub struct Weather {
    config: WeatherConfig,
    raining: bool,
    remaining: f32,
    countdown: f32,
    elapsed: f32,
    drops: Vec<RainDrop>,
}

impl Weather {
    pub fn new(config: WeatherConfig, rng: &mut impl Rng) -> Self {
        let countdown = sample_range(rng, config.interval);
        Self {
            config,
            raining: false,
            remaining: 0.0,
            countdown,
            elapsed: 0.0,
            drops: Vec::new(),
        }
    }

    pub fn is_raining(&self) -> bool {
        self.raining
    }

    pub fn drops(&self) -> &[RainDrop] {
        &self.drops
    }

    /// Seconds of simulated time so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Simulated time at which the next shower starts; `None` while raining.
    pub fn next_rain_at(&self) -> Option<f32> {
        (!self.raining).then_some(self.elapsed + self.countdown)
    }

    /// Seconds of rain left.
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn update(&mut self, dt: f32, graph: &mut SceneGraph, rng: &mut impl Rng) {
        self.elapsed += dt;
        if self.raining {
            self.remaining -= dt;
            if self.remaining <= 0.0 {
                self.stop(graph, rng);
                return;
            }
            let ground = self.config.ground;
            self.drops.retain_mut(|drop| {
                drop.position += drop.velocity * dt;
                if drop.position.y < ground {
                    graph.remove(drop.node);
                    return false;
                }
                graph.set_local(drop.node, Instance::from(drop.position));
                true
            });
        } else if self.config.enabled {
            self.countdown -= dt;
            if self.countdown <= 0.0 {
                self.start(graph, rng);
            }
        }
    }

    /// Starts a shower right away.
    pub fn start(&mut self, graph: &mut SceneGraph, rng: &mut impl Rng) {
        let [min, max] = self.config.drops;
        let count = if max > min { rng.random_range(min..=max) } else { min };
        let [fall_min, fall_max] = self.config.fall_speed;
        for _ in 0..count {
            let angle = rng.random_range(0.0..std::f32::consts::TAU);
            let radius = self.config.area_radius * rng.random::<f32>().sqrt();
            let position = Vector3::new(
                angle.cos() * radius,
                self.config.ceiling + rng.random_range(0.0..10.0),
                angle.sin() * radius,
            );
            let jitter = self.config.jitter;
            let velocity = Vector3::new(
                rng.random_range(-jitter..=jitter),
                -sample_range(rng, [fall_min, fall_max]),
                rng.random_range(-jitter..=jitter),
            );
            let node = graph.add_root(procedural::raindrop().with_local(Instance::from(position)));
            self.drops.push(RainDrop {
                node,
                position,
                velocity,
            });
        }
        self.raining = true;
        self.remaining = self.config.duration;
        info!("Rain started with {} drops for {}s", count, self.config.duration);
    }

    fn stop(&mut self, graph: &mut SceneGraph, rng: &mut impl Rng) {
        self.clear(graph, rng);
        info!("Rain stopped, next shower in {:.0}s", self.countdown);
    }

    /// Removes all drops, ends any shower and schedules the next one.
    pub fn clear(&mut self, graph: &mut SceneGraph, rng: &mut impl Rng) {
        for drop in self.drops.drain(..) {
            graph.remove(drop.node);
        }
        self.raining = false;
        self.remaining = 0.0;
        self.countdown = sample_range(rng, self.config.interval);
    }
}

pub struct Environment {
    source: Box<dyn DayNightSource>,
    lighting: Lighting,
    pub weather: Weather,
}

impl Environment {
    pub fn new(source: Box<dyn DayNightSource>, weather: Weather) -> Self {
        let lighting = Lighting::from_blend(source.blend());
        Self {
            source,
            lighting,
            weather,
        }
    }

    pub fn set_source(&mut self, source: Box<dyn DayNightSource>) {
        debug!("Switched day-night source");
        self.source = source;
    }

    pub fn update(&mut self, dt: f32, graph: &mut SceneGraph, rng: &mut impl Rng) {
        self.lighting = Lighting::from_blend(self.source.blend());
        self.weather.update(dt, graph, rng);
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("lighting", &self.lighting)
            .field("weather", &self.weather)
            .finish()
    }
}
