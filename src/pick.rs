//! Pointer picking against buildings.
//!
//! Picking casts the pointer ray into the scene and tests it against the
//! world bounds of every node under a building root:
//! 1. Build the ray from the pointer position and the current camera
//! 2. Find the nearest node whose bounds the ray enters
//! 3. Walk up from that node to the tagged ancestor, which names the building
//!
//! Hidden stand-ins are pickable too, so a building is a click target as soon
//! as it is registered, before its visual has loaded.

use log::debug;

use crate::{
    camera::Ray,
    config::BuildingConfig,
    context::{Context, Cursor},
    data_structures::scene_graph::{NodeTag, SceneGraph},
    world::buildings::BuildingRegistry,
};

/// Receives interaction and loading notifications for the UI layer.
pub trait VillageObserver {
    fn on_building_click(&mut self, _building: &BuildingConfig) {}
    fn on_building_hover(&mut self, _building: Option<&BuildingConfig>) {}
    fn on_loading_progress(&mut self, _fraction: f32) {}
    fn on_loading_complete(&mut self) {}
}

/// Ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl VillageObserver for NoopObserver {}

/// Index of the nearest building hit by `ray`.
pub fn pick_building(ray: &Ray, graph: &SceneGraph, buildings: &BuildingRegistry) -> Option<usize> {
    let mut nearest: Option<(f32, usize)> = None;
    for building in buildings.iter() {
        for node_id in graph.descendants(building.root) {
            let Some(node) = graph.get(node_id) else {
                continue;
            };
            let Some(bounds) = node.visual.local_bounds() else {
                continue;
            };
            let Some(world) = graph.world_transform(node_id) else {
                continue;
            };
            let Some(distance) = ray.intersect_aabb(&bounds.transformed(&world)) else {
                continue;
            };
            if nearest.is_some_and(|(best, _)| best <= distance) {
                continue;
            }
            if let Some(NodeTag::Building(index)) = graph.find_tag(node_id) {
                nearest = Some((distance, index));
            }
        }
    }
    nearest.map(|(_, index)| index)
}

#[derive(Debug, Default)]
pub struct Interaction {
    hovered: Option<usize>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Moves the pointer to `ndc` and updates highlight, cursor and hover
    /// callbacks.
    pub fn update_hover(
        &mut self,
        ndc: (f32, f32),
        ctx: &mut Context,
        graph: &mut SceneGraph,
        buildings: &mut BuildingRegistry,
        observer: &mut dyn VillageObserver,
    ) -> Option<usize> {
        ctx.pointer = Some(ndc);
        let hit = ctx
            .pointer_ray()
            .and_then(|ray| pick_building(&ray, graph, buildings));
        if hit == self.hovered {
            return hit;
        }
        if let Some(previous) = self.hovered.take() {
            buildings.set_hovered(previous, false, graph);
        }
        match hit.and_then(|index| buildings.get(index).map(|b| (index, b.config.is_locked))) {
            Some((index, locked)) => {
                buildings.set_hovered(index, true, graph);
                ctx.cursor = if locked { Cursor::NotAllowed } else { Cursor::Pointer };
                self.hovered = Some(index);
                if let Some(building) = buildings.get(index) {
                    debug!("Hovering {}", building.config.id);
                    observer.on_building_hover(Some(&building.config));
                }
            }
            None => {
                ctx.cursor = Cursor::Default;
                observer.on_building_hover(None);
            }
        }
        self.hovered
    }

    /// Fires the click callback for the unlocked building under the pointer.
    /// Returns whether a click was delivered.
    pub fn handle_click(
        &self,
        ctx: &Context,
        graph: &SceneGraph,
        buildings: &BuildingRegistry,
        observer: &mut dyn VillageObserver,
    ) -> bool {
        let Some(index) = ctx
            .pointer_ray()
            .and_then(|ray| pick_building(&ray, graph, buildings))
        else {
            return false;
        };
        match buildings.get(index) {
            Some(building) if !building.config.is_locked => {
                observer.on_building_click(&building.config);
                true
            }
            Some(building) => {
                debug!("Ignoring click on locked building {}", building.config.id);
                false
            }
            None => false,
        }
    }

    /// Forgets the hovered building without touching the scene.
    pub fn reset(&mut self) {
        self.hovered = None;
    }
}
