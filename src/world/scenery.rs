//! Scenery spawner.
//!
//! Walks the designer layouts in order and asks the validator for a free
//! spot near every authored position. Each placed element registers its own
//! zone right away, so later categories avoid earlier ones. The procedural
//! stand-in is visible from the start; the category's asset replaces it on
//! every element once loaded.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::{
    config::{SceneryCategory, SceneryLayout},
    data_structures::{
        instance::Instance,
        procedural,
        scene_graph::{Node, NodeId, SceneGraph, VisualSlot},
    },
    placement::{CollisionZone, PlacementValidator, ZoneKind},
    resources::cache::AssetCache,
    world::{AssetResult, LoadEvent, LoadQueue},
};

#[derive(Debug)]
pub struct SceneryElement {
    pub category: SceneryCategory,
    pub root: NodeId,
    pub slot: VisualSlot,
    pub zone: CollisionZone,
}

/// Placed and skipped element counts per category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScenerySummary {
    pub placed: BTreeMap<SceneryCategory, usize>,
    pub skipped: BTreeMap<SceneryCategory, usize>,
}

impl ScenerySummary {
    pub fn total_placed(&self) -> usize {
        self.placed.values().sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }
}

#[derive(Debug)]
pub struct ScenerySpawner {
    layouts: Vec<SceneryLayout>,
    elements: Vec<SceneryElement>,
    summary: ScenerySummary,
}

impl ScenerySpawner {
    pub fn new(layouts: Vec<SceneryLayout>) -> Self {
        Self {
            layouts,
            elements: Vec::new(),
            summary: ScenerySummary::default(),
        }
    }

    /// Places every layout and starts one asset load per category.
    pub fn decorate(
        &mut self,
        graph: &mut SceneGraph,
        validator: &mut PlacementValidator,
        loads: &mut LoadQueue,
        cache: &AssetCache,
    ) -> &ScenerySummary {
        self.clear(graph);
        for layout in &self.layouts {
            let mut placed = 0;
            let mut skipped = 0;
            for &[x, z] in &layout.positions {
                let (px, pz) =
                    match validator.find_nearby_free(x, z, layout.zone_radius, layout.max_attempts) {
                        Ok(spot) => spot,
                        Err(err) => {
                            warn!("Skipping {} element: {}", layout.category.name(), err);
                            skipped += 1;
                            continue;
                        }
                    };
                let root = graph.add_root(
                    Node::new(layout.category.name()).with_local(Instance::at(px, 0.0, pz)),
                );
                let Some(slot) =
                    VisualSlot::pending(graph, root, procedural::scenery(layout.category), true)
                else {
                    graph.remove(root);
                    skipped += 1;
                    continue;
                };
                let zone = CollisionZone::new(px, pz, layout.zone_radius, ZoneKind::Scenery(layout.category));
                validator.register_zone(zone);
                self.elements.push(SceneryElement {
                    category: layout.category,
                    root,
                    slot,
                    zone,
                });
                placed += 1;
            }
            *self.summary.placed.entry(layout.category).or_default() += placed;
            *self.summary.skipped.entry(layout.category).or_default() += skipped;
            if placed > 0 {
                let category = layout.category;
                let load = cache.load_first_available(&layout.assets);
                loads.spawn(async move {
                    LoadEvent::Scenery {
                        category,
                        result: load.await,
                    }
                });
            }
        }
        info!(
            "Decorated village with {} elements ({} skipped)",
            self.summary.total_placed(),
            self.summary.total_skipped()
        );
        &self.summary
    }

    /// Applies a category asset to every element still showing its stand-in.
    pub fn on_asset_loaded(
        &mut self,
        category: SceneryCategory,
        result: AssetResult,
        graph: &mut SceneGraph,
    ) {
        let Some(layout) = self.layouts.iter().find(|l| l.category == category) else {
            return;
        };
        let elements = self.elements.iter_mut().filter(|e| e.category == category);
        match result {
            Ok(model) => {
                let fit = model.fit_to_height(layout.target_height, layout.vertical_offset);
                let mut swapped = 0;
                for element in elements {
                    if element.slot.resolve(graph, model.clone(), fit) {
                        swapped += 1;
                    }
                }
                debug!("Swapped {} {} for {}", swapped, category.name(), model.name);
            }
            Err(err) => {
                warn!("{} keep their procedural look: {}", category.name(), err);
                for element in elements {
                    element.slot.fail(graph);
                }
            }
        }
    }

    /// Removes every placed element. Zones are reset by the building registry.
    pub fn clear(&mut self, graph: &mut SceneGraph) {
        for element in self.elements.drain(..) {
            graph.remove(element.root);
        }
        self.summary = ScenerySummary::default();
    }

    pub fn elements(&self) -> &[SceneryElement] {
        &self.elements
    }

    pub fn summary(&self) -> &ScenerySummary {
        &self.summary
    }
}
