//! Configuration for the village: layout entries coming from the backend plus
//! the tuning and asset catalog of every subsystem.
//!
//! Every section carries `#[serde(default)]`, so a partial JSON document only
//! overrides what it names.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::{data_structures::material::Color, error::ConfigError};

/// Building archetypes known to the village.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingVariant {
    House,
    Shop,
    Alchemy,
    Temple,
    Tavern,
    Guild,
    Dungeon,
}

impl BuildingVariant {
    pub const ALL: [BuildingVariant; 7] = [
        BuildingVariant::House,
        BuildingVariant::Shop,
        BuildingVariant::Alchemy,
        BuildingVariant::Temple,
        BuildingVariant::Tavern,
        BuildingVariant::Guild,
        BuildingVariant::Dungeon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuildingVariant::House => "house",
            BuildingVariant::Shop => "shop",
            BuildingVariant::Alchemy => "alchemy",
            BuildingVariant::Temple => "temple",
            BuildingVariant::Tavern => "tavern",
            BuildingVariant::Guild => "guild",
            BuildingVariant::Dungeon => "dungeon",
        }
    }

    /// Radius of the collision zone the building occupies.
    pub fn zone_radius(self) -> f32 {
        match self {
            BuildingVariant::House | BuildingVariant::Shop | BuildingVariant::Alchemy => 3.5,
            BuildingVariant::Tavern | BuildingVariant::Guild => 4.0,
            BuildingVariant::Temple | BuildingVariant::Dungeon => 5.5,
        }
    }

    /// Height the loaded asset is normalised to.
    pub fn target_height(self) -> f32 {
        match self {
            BuildingVariant::House | BuildingVariant::Shop => 5.0,
            BuildingVariant::Alchemy => 5.5,
            BuildingVariant::Tavern | BuildingVariant::Guild => 6.5,
            BuildingVariant::Temple => 8.0,
            BuildingVariant::Dungeon => 7.0,
        }
    }
}

/// One building as delivered by the layout backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingConfig {
    pub id: String,
    pub variant: BuildingVariant,
    pub position: [f32; 3],
    /// Yaw in radians.
    #[serde(default)]
    pub rotation: Option<f32>,
    #[serde(default = "default_building_color")]
    pub color: Color,
    #[serde(default)]
    pub npc_id: Option<String>,
    #[serde(default)]
    pub facility_id: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub highlight_color: Option<Color>,
    #[serde(default)]
    pub is_locked: bool,
}

fn default_building_color() -> Color {
    Color::from_hex(0xc8a27a)
}

impl BuildingConfig {
    pub fn new(id: impl Into<String>, variant: BuildingVariant, x: f32, z: f32) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            variant,
            position: [x, 0.0, z],
            rotation: None,
            color: default_building_color(),
            npc_id: None,
            facility_id: None,
            highlight_color: None,
            is_locked: false,
        }
    }

    pub fn locked(mut self) -> Self {
        self.is_locked = true;
        self
    }

    pub fn highlight(&self) -> Color {
        self.highlight_color.unwrap_or(Color::from_hex(0xffe08a))
    }
}

/// Parses the building layout list.
pub fn buildings_from_json_str(json: &str) -> Result<Vec<BuildingConfig>, ConfigError> {
    serde_json::from_str(json).map_err(ConfigError::Parse)
}

/// Top-level configuration of the village core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VillageConfig {
    pub world: WorldConfig,
    pub villagers: VillagerConfig,
    pub critters: CritterConfig,
    pub weather: WeatherConfig,
    pub catalog: CatalogConfig,
    pub scenery: SceneryConfig,
}

impl VillageConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Parse)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_json_str(&contents)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ZoneConfig {
    pub x: f32,
    pub z: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed for every random decision of the simulation.
    pub seed: u64,
    /// Radius of the playable village disc.
    pub radius: f32,
    /// Always-occupied plaza in the middle of the village.
    pub center_zone: ZoneConfig,
    /// Vertical amplitude of the floating dungeon.
    pub float_amplitude: f32,
    /// Angular speed of the floating dungeon in rad/s.
    pub float_speed: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_2024,
            radius: 60.0,
            center_zone: ZoneConfig {
                x: 0.0,
                z: 0.0,
                radius: 6.0,
            },
            float_amplitude: 0.3,
            float_speed: 1.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VillagerConfig {
    pub count: usize,
    /// Targets are sampled between `inner_radius` and `outer_radius` around the centre.
    pub inner_radius: f32,
    pub outer_radius: f32,
    /// Footprint of one villager.
    pub radius: f32,
    /// Extra spacing kept between villagers.
    pub buffer: f32,
    /// Units per second before the individual multiplier.
    pub base_speed: f32,
    pub speed_multiplier: [f32; 2],
    pub idle_wait: [f32; 2],
    pub arrival_wait: [f32; 2],
    /// Wait after a failed target search.
    pub retry_wait: f32,
    pub target_attempts: usize,
    pub target_distance: [f32; 2],
    pub arrival_threshold: f32,
    pub spawn_attempts: usize,
    pub walk_fade: f32,
    pub idle_fade: f32,
}

impl Default for VillagerConfig {
    fn default() -> Self {
        Self {
            count: 8,
            inner_radius: 8.0,
            outer_radius: 30.0,
            radius: 0.5,
            buffer: 0.3,
            base_speed: 1.6,
            speed_multiplier: [0.9, 1.4],
            idle_wait: [1.0, 4.0],
            arrival_wait: [1.5, 4.5],
            retry_wait: 0.5,
            target_attempts: 20,
            target_distance: [2.0, 12.0],
            arrival_threshold: 0.15,
            spawn_attempts: 40,
            walk_fade: 0.35,
            idle_fade: 0.45,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CritterConfig {
    pub enabled: bool,
    /// Seconds between two spawns, sampled uniformly.
    pub spawn_interval: [f32; 2],
    /// Fraction of the world radius at which critters enter the scene.
    pub edge_fraction: f32,
}

impl Default for CritterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spawn_interval: [3.0, 8.0],
            edge_fraction: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeatherConfig {
    pub enabled: bool,
    /// Seconds until the next shower, sampled uniformly.
    pub interval: [f32; 2],
    pub duration: f32,
    /// Inclusive range of raindrops per shower.
    pub drops: [u32; 2],
    pub ceiling: f32,
    pub ground: f32,
    pub fall_speed: [f32; 2],
    pub jitter: f32,
    /// Drops spawn within this distance of the centre.
    pub area_radius: f32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: [600.0, 3600.0],
            duration: 120.0,
            drops: [80, 120],
            ceiling: 40.0,
            ground: 0.0,
            fall_speed: [18.0, 26.0],
            jitter: 0.8,
            area_radius: 45.0,
        }
    }
}

/// Asset URLs. Every entry is an ordered candidate list tried front to back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub buildings: BTreeMap<BuildingVariant, Vec<String>>,
    /// Interchangeable villager looks.
    pub villagers: Vec<Vec<String>>,
}

impl CatalogConfig {
    pub fn building_urls(&self, variant: BuildingVariant) -> &[String] {
        self.buildings
            .get(&variant)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let buildings = BuildingVariant::ALL
            .iter()
            .map(|variant| {
                (
                    *variant,
                    vec![
                        format!("models/buildings/{}.glb", variant.name()),
                        format!("models/{}.glb", variant.name()),
                    ],
                )
            })
            .collect();
        Self {
            buildings,
            villagers: vec![
                vec!["models/villagers/villager_a.glb".into()],
                vec!["models/villagers/villager_b.glb".into()],
            ],
        }
    }
}

/// Decoration kinds, in the order they are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneryCategory {
    Trees,
    Flowers,
    Rocks,
    Grass,
    Lanterns,
    Mountains,
    ScenicHouses,
}

impl SceneryCategory {
    pub const ORDER: [SceneryCategory; 7] = [
        SceneryCategory::Trees,
        SceneryCategory::Flowers,
        SceneryCategory::Rocks,
        SceneryCategory::Grass,
        SceneryCategory::Lanterns,
        SceneryCategory::Mountains,
        SceneryCategory::ScenicHouses,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SceneryCategory::Trees => "trees",
            SceneryCategory::Flowers => "flowers",
            SceneryCategory::Rocks => "rocks",
            SceneryCategory::Grass => "grass",
            SceneryCategory::Lanterns => "lanterns",
            SceneryCategory::Mountains => "mountains",
            SceneryCategory::ScenicHouses => "scenic_houses",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneryLayout {
    pub category: SceneryCategory,
    /// Designer-authored `[x, z]` spots.
    pub positions: Vec<[f32; 2]>,
    pub assets: Vec<String>,
    pub target_height: f32,
    #[serde(default)]
    pub vertical_offset: f32,
    pub zone_radius: f32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

fn default_max_attempts() -> usize {
    24
}

impl SceneryLayout {
    fn new(
        category: SceneryCategory,
        target_height: f32,
        zone_radius: f32,
        positions: &[[f32; 2]],
    ) -> Self {
        Self {
            category,
            positions: positions.to_vec(),
            assets: vec![
                format!("models/scenery/{}.glb", category.name()),
                format!("models/{}.glb", category.name()),
            ],
            target_height,
            vertical_offset: 0.0,
            zone_radius,
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneryConfig {
    /// Placed in list order; the default list follows [`SceneryCategory::ORDER`].
    pub layouts: Vec<SceneryLayout>,
}

impl Default for SceneryConfig {
    fn default() -> Self {
        use SceneryCategory::*;
        Self {
            layouts: vec![
                SceneryLayout::new(
                    Trees,
                    7.0,
                    1.5,
                    &[
                        [-32.0, -20.0],
                        [-28.0, 24.0],
                        [30.0, -26.0],
                        [34.0, 18.0],
                        [-40.0, 4.0],
                        [41.0, -3.0],
                        [-12.0, 38.0],
                        [14.0, -40.0],
                        [-22.0, -36.0],
                        [24.0, 36.0],
                        [-45.0, -18.0],
                        [46.0, 22.0],
                    ],
                ),
                SceneryLayout::new(
                    Flowers,
                    0.6,
                    0.4,
                    &[
                        [-8.0, 9.0],
                        [9.0, 8.5],
                        [-9.5, -8.0],
                        [8.0, -9.0],
                        [-15.0, 2.0],
                        [15.5, -1.5],
                        [2.0, 15.0],
                        [-2.5, -15.5],
                    ],
                ),
                SceneryLayout::new(
                    Rocks,
                    1.2,
                    0.9,
                    &[
                        [-25.0, 10.0],
                        [26.0, 9.0],
                        [-18.0, -27.0],
                        [19.0, 28.0],
                        [0.0, -33.0],
                        [-36.0, 30.0],
                    ],
                ),
                SceneryLayout::new(
                    Grass,
                    0.5,
                    0.3,
                    &[
                        [-6.0, 20.0],
                        [7.0, 21.0],
                        [-21.0, -6.0],
                        [22.0, -7.0],
                        [-11.0, -20.0],
                        [12.0, -19.0],
                        [-27.0, 16.0],
                        [28.0, -15.0],
                    ],
                ),
                SceneryLayout::new(
                    Lanterns,
                    2.4,
                    0.5,
                    &[[-7.0, 0.0], [7.0, 0.0], [0.0, 7.0], [0.0, -7.0]],
                ),
                SceneryLayout::new(
                    Mountains,
                    30.0,
                    12.0,
                    &[[-80.0, -70.0], [0.0, -95.0], [85.0, -60.0], [-95.0, 20.0]],
                ),
                SceneryLayout::new(
                    ScenicHouses,
                    4.5,
                    3.0,
                    &[[-50.0, 35.0], [52.0, 40.0], [48.0, -44.0]],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_entry_uses_camel_case_and_hex_colours() {
        let json = r#"[{
            "id": "guild-1",
            "variant": "guild",
            "position": [4.0, 0.0, -3.0],
            "color": 16711680,
            "highlightColor": 255,
            "isLocked": true,
            "npcId": "npc-7"
        }]"#;
        let buildings = buildings_from_json_str(json).unwrap();
        assert_eq!(buildings.len(), 1);
        let guild = &buildings[0];
        assert_eq!(guild.variant, BuildingVariant::Guild);
        assert!(guild.is_locked);
        assert_eq!(guild.color.to_hex(), 0xff0000);
        assert_eq!(guild.highlight().to_hex(), 0x0000ff);
        assert_eq!(guild.npc_id.as_deref(), Some("npc-7"));
        assert_eq!(guild.rotation, None);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = VillageConfig::from_json_str(r#"{ "world": { "seed": 7 } }"#).unwrap();
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.world.radius, WorldConfig::default().radius);
        assert_eq!(config.villagers, VillagerConfig::default());
        assert_eq!(config.catalog.building_urls(BuildingVariant::Dungeon).len(), 2);
    }

    #[test]
    fn default_scenery_follows_fixed_order() {
        let order: Vec<_> = SceneryConfig::default()
            .layouts
            .iter()
            .map(|layout| layout.category)
            .collect();
        assert_eq!(order, SceneryCategory::ORDER.to_vec());
    }

    #[test]
    fn larger_buildings_get_larger_zones() {
        assert!(BuildingVariant::Temple.zone_radius() > BuildingVariant::House.zone_radius());
        assert!(BuildingVariant::Dungeon.zone_radius() > BuildingVariant::Tavern.zone_radius());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            VillageConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
