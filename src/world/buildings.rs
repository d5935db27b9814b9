//! Building registry.
//!
//! Applying a layout rebuilds everything from scratch: every building gets a
//! tagged root, a hidden procedural fallback that is swapped for its
//! variant's asset, a collision zone, a hover highlight and, when unlocked, a point
//! light. Each distinct variant is loaded once and every building using it
//! settles together. Zones, labels and click targets exist immediately; the
//! visuals catch up as loads settle.

use std::collections::BTreeSet;

use cgmath::{Point3, Vector3};
use log::{debug, info, warn};

use crate::{
    config::{BuildingConfig, BuildingVariant, CatalogConfig, ZoneConfig},
    data_structures::{
        instance::Instance,
        material::{Color, Material},
        procedural,
        scene_graph::{Node, NodeId, NodeTag, SceneGraph, VisualSlot},
    },
    placement::{CollisionZone, PlacementValidator, ZoneKind},
    resources::cache::AssetCache,
    world::{AssetResult, LoadEvent, LoadQueue},
};

pub const HOVER_OPACITY: f32 = 0.35;
pub const HOVER_OPACITY_LOCKED: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Point3<f32>,
    pub color: Color,
    pub intensity: f32,
    pub range: f32,
}

#[derive(Debug)]
pub struct BuildingInstance {
    /// Position in the applied layout list.
    pub index: usize,
    pub config: BuildingConfig,
    /// Tagged root; picks resolve to the building through it.
    pub root: NodeId,
    pub slot: VisualSlot,
    pub highlight: NodeId,
    pub light: Option<PointLight>,
    pub hovered: bool,
    /// World point above the roof where the UI places the name label.
    pub label_anchor: Point3<f32>,
}

impl BuildingInstance {
    pub fn zone(&self) -> CollisionZone {
        CollisionZone::new(
            self.config.position[0],
            self.config.position[2],
            self.config.variant.zone_radius(),
            ZoneKind::Building,
        )
    }
}

/// Coarse loading progress: one unit per distinct building variant.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LoadProgress {
    pub total: usize,
    pub done: usize,
}

impl LoadProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.done as f32 / self.total as f32
        }
    }

    pub fn is_done(&self) -> bool {
        self.done >= self.total
    }
}

#[derive(Debug, Default)]
pub struct BuildingRegistry {
    buildings: Vec<BuildingInstance>,
    floating: Vec<usize>,
    progress: LoadProgress,
    settled: usize,
}

impl BuildingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frees every building node and resets the zone list to the plaza.
    pub fn clear(
        &mut self,
        graph: &mut SceneGraph,
        validator: &mut PlacementValidator,
        center: &ZoneConfig,
    ) {
        for building in self.buildings.drain(..) {
            graph.remove(building.root);
        }
        self.floating.clear();
        self.progress = LoadProgress::default();
        self.settled = 0;
        validator.clear_zones();
        validator.register_zone(CollisionZone::new(
            center.x,
            center.z,
            center.radius,
            ZoneKind::VillageCenter,
        ));
    }

    /// Places `configs` and starts their loads. Callers clear first.
    pub fn apply(
        &mut self,
        configs: Vec<BuildingConfig>,
        graph: &mut SceneGraph,
        validator: &mut PlacementValidator,
        loads: &mut LoadQueue,
        cache: &AssetCache,
        catalog: &CatalogConfig,
    ) {
        let variants: BTreeSet<BuildingVariant> = configs.iter().map(|c| c.variant).collect();
        self.progress = LoadProgress {
            total: variants.len(),
            done: 0,
        };
        for variant in variants {
            let load = cache.load_first_available(catalog.building_urls(variant));
            loads.spawn(async move {
                LoadEvent::Variant {
                    variant,
                    result: load.await,
                }
            });
        }

        for (index, config) in configs.into_iter().enumerate() {
            let Some(building) = Self::place(index, config, graph) else {
                continue;
            };
            validator.register_zone(building.zone());
            if building.config.variant == BuildingVariant::Dungeon {
                self.floating.push(index);
            }
            self.buildings.push(building);
        }
        info!(
            "Applied {} buildings across {} variants",
            self.buildings.len(),
            self.progress.total
        );
    }

    fn place(index: usize, config: BuildingConfig, graph: &mut SceneGraph) -> Option<BuildingInstance> {
        let [x, y, z] = config.position;
        let local = Instance::at(x, y, z).with_yaw(config.rotation.unwrap_or(0.0));
        let root = graph.add_root(
            Node::new(format!("building {}", config.id))
                .with_local(local)
                .tagged(NodeTag::Building(index)),
        );
        let wrapper = graph.insert(Node::new("visual"), Some(root))?;
        let fallback = procedural::building(config.variant, config.color);
        let slot = VisualSlot::pending(graph, wrapper, fallback, false)?;
        let highlight = graph.insert(procedural::highlight(config.variant, config.highlight()), Some(root))?;
        let light = (!config.is_locked).then(|| PointLight {
            position: Point3::new(x, y + config.variant.target_height() * 0.6, z + 1.5),
            color: Color::from_hex(0xffc46b),
            intensity: 1.2,
            range: config.variant.zone_radius() * 3.0,
        });
        let label_anchor = Point3::new(x, y + config.variant.target_height() + 1.5, z);
        Some(BuildingInstance {
            index,
            config,
            root,
            slot,
            highlight,
            light,
            hovered: false,
            label_anchor,
        })
    }

    /// Settles every building of `variant` with the shared result: each one
    /// swaps in the asset, or reveals its fallback on failure. Returns the new
    /// progress.
    pub fn on_variant_loaded(
        &mut self,
        variant: BuildingVariant,
        result: AssetResult,
        graph: &mut SceneGraph,
    ) -> LoadProgress {
        match &result {
            Ok(model) => debug!("Variant {} resolved to {}", variant.name(), model.name),
            Err(err) => warn!("Variant {} falls back to procedural geometry: {}", variant.name(), err),
        }
        let fit = result
            .as_ref()
            .ok()
            .map(|model| model.fit_to_height(variant.target_height(), 0.0));
        for building in self.buildings.iter_mut().filter(|b| b.config.variant == variant) {
            match (&result, fit) {
                (Ok(model), Some(fit)) => {
                    if !building.slot.resolve(graph, model.clone(), fit) {
                        debug!("Building {} was removed before its asset arrived", building.config.id);
                    }
                }
                _ => {
                    building.slot.fail(graph);
                }
            }
            self.settled += 1;
        }
        self.progress.done = (self.progress.done + 1).min(self.progress.total);
        self.progress
    }

    /// Every building has its final visual and every variant reported.
    pub fn is_settled(&self) -> bool {
        self.settled >= self.buildings.len() && self.progress.is_done()
    }

    pub fn progress(&self) -> LoadProgress {
        self.progress
    }

    /// Bobs floating buildings around their configured height.
    pub fn update_float(&self, graph: &mut SceneGraph, elapsed: f32, amplitude: f32, speed: f32) {
        for building in self.floating.iter().filter_map(|&index| self.get(index)) {
            if let Some(node) = graph.get_mut(building.root) {
                node.local.position.y =
                    building.config.position[1] + amplitude * (elapsed * speed).sin();
            }
        }
    }

    pub fn set_hovered(&mut self, index: usize, hovered: bool, graph: &mut SceneGraph) {
        let Some(building) = self.get_mut(index) else {
            return;
        };
        building.hovered = hovered;
        let opacity = match (hovered, building.config.is_locked) {
            (false, _) => 0.0,
            (true, false) => HOVER_OPACITY,
            (true, true) => HOVER_OPACITY_LOCKED,
        };
        let tint = building.config.highlight();
        if let Some(node) = graph.get_mut(building.highlight) {
            node.material = Material::overlay(tint, opacity);
        }
    }

    pub fn get(&self, index: usize) -> Option<&BuildingInstance> {
        self.buildings.iter().find(|b| b.index == index)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut BuildingInstance> {
        self.buildings.iter_mut().find(|b| b.index == index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildingInstance> {
        self.buildings.iter()
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// Indices of buildings animated by [`Self::update_float`].
    pub fn floating(&self) -> &[usize] {
        &self.floating
    }

    pub fn lights(&self) -> impl Iterator<Item = PointLight> + '_ {
        self.buildings.iter().filter_map(|b| b.light)
    }

    pub fn label_positions(&self) -> impl Iterator<Item = (&BuildingConfig, Point3<f32>)> {
        self.buildings.iter().map(|b| (&b.config, b.label_anchor))
    }

    /// Middle of the building volume, handy for aiming a pointer at it.
    pub fn center_of(&self, index: usize) -> Option<Point3<f32>> {
        self.get(index).map(|b| {
            let [x, y, z] = b.config.position;
            Point3::new(x, y, z) + Vector3::new(0.0, b.config.variant.target_height() * 0.5, 0.0)
        })
    }
}
