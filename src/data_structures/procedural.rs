//! Procedural stand-in geometry.
//!
//! Everything that can come from an external model has a cheap procedural
//! version built from primitive shapes. It is shown while the asset is still
//! loading (scenery) or when loading fails (everything).

use crate::{
    config::{BuildingVariant, SceneryCategory},
    data_structures::{
        instance::Instance,
        material::{Color, Material},
        scene_graph::{Node, NodeId, SceneGraph, Shape},
    },
    world::critters::CritterKind,
};

/// Name of the child nodes that critters flap.
pub const WING: &str = "wing";

/// A root node plus flat children, attached in one go.
#[derive(Clone, Debug)]
pub struct Assembly {
    pub root: Node,
    pub parts: Vec<Node>,
}

impl Assembly {
    pub fn new(name: &str) -> Self {
        Self {
            root: Node::new(name),
            parts: Vec::new(),
        }
    }

    pub fn single(node: Node) -> Self {
        Self {
            root: node,
            parts: Vec::new(),
        }
    }

    fn part(mut self, name: &str, shape: Shape, material: Material, local: Instance) -> Self {
        self.parts
            .push(Node::shape(name, shape, material).with_local(local));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.root.visible = false;
        self
    }

    pub fn with_local(mut self, local: Instance) -> Self {
        self.root.local = local;
        self
    }

    /// Inserts the assembly under `parent` and returns the root handle.
    pub fn attach(self, graph: &mut SceneGraph, parent: Option<NodeId>) -> Option<NodeId> {
        let root = graph.insert(self.root, parent)?;
        for part in self.parts {
            graph.insert(part, Some(root))?;
        }
        Some(root)
    }
}

fn solid(hex: u32) -> Material {
    Material::solid(Color::from_hex(hex))
}

/// House-like massing per variant, tinted with the configured colour.
pub fn building(variant: BuildingVariant, color: Color) -> Assembly {
    let walls = Material::solid(color);
    let roof = solid(0x8b3a2e);
    let name = format!("{} (fallback)", variant.name());
    let assembly = Assembly::new(&name);
    match variant {
        BuildingVariant::House | BuildingVariant::Shop | BuildingVariant::Alchemy => assembly
            .part(
                "walls",
                Shape::Box { width: 4.0, height: 3.0, depth: 4.0 },
                walls,
                Instance::new(),
            )
            .part(
                "roof",
                Shape::Cone { radius: 3.2, height: 2.0 },
                roof,
                Instance::at(0.0, 3.0, 0.0),
            ),
        BuildingVariant::Tavern | BuildingVariant::Guild => assembly
            .part(
                "walls",
                Shape::Box { width: 6.0, height: 4.0, depth: 5.0 },
                walls,
                Instance::new(),
            )
            .part(
                "roof",
                Shape::Cone { radius: 4.3, height: 2.5 },
                roof,
                Instance::at(0.0, 4.0, 0.0),
            ),
        BuildingVariant::Temple => {
            let mut temple = assembly
                .part(
                    "base",
                    Shape::Box { width: 8.0, height: 0.8, depth: 8.0 },
                    solid(0xd8d2c4),
                    Instance::new(),
                )
                .part(
                    "roof",
                    Shape::Box { width: 8.4, height: 0.8, depth: 8.4 },
                    walls,
                    Instance::at(0.0, 5.6, 0.0),
                );
            for (x, z) in [(-3.2, -3.2), (3.2, -3.2), (-3.2, 3.2), (3.2, 3.2)] {
                temple = temple.part(
                    "column",
                    Shape::Cylinder { radius_top: 0.4, radius_bottom: 0.5, height: 4.8 },
                    solid(0xeeeae0),
                    Instance::at(x, 0.8, z),
                );
            }
            temple
        }
        BuildingVariant::Dungeon => assembly
            .part(
                "keep",
                Shape::Box { width: 7.0, height: 5.0, depth: 7.0 },
                solid(0x3d3848),
                Instance::new(),
            )
            .part(
                "spire",
                Shape::Cone { radius: 2.0, height: 3.0 },
                solid(0x5b2a86),
                Instance::at(0.0, 5.0, 0.0),
            ),
    }
}

/// Flat transparent disc under a building, brightened on hover.
pub fn highlight(variant: BuildingVariant, tint: Color) -> Node {
    let radius = variant.zone_radius();
    Node::shape(
        "highlight",
        Shape::Cylinder { radius_top: radius, radius_bottom: radius, height: 0.1 },
        Material::overlay(tint, 0.0),
    )
    .with_local(Instance::at(0.0, 0.02, 0.0))
}

pub fn scenery(category: SceneryCategory) -> Assembly {
    let name = format!("{} (fallback)", category.name());
    let assembly = Assembly::new(&name);
    match category {
        SceneryCategory::Trees => assembly
            .part(
                "trunk",
                Shape::Cylinder { radius_top: 0.25, radius_bottom: 0.35, height: 2.5 },
                solid(0x6b4a2b),
                Instance::new(),
            )
            .part(
                "foliage",
                Shape::Cone { radius: 1.6, height: 4.5 },
                solid(0x2f7d32),
                Instance::at(0.0, 2.5, 0.0),
            ),
        SceneryCategory::Flowers => assembly
            .part(
                "stem",
                Shape::Cylinder { radius_top: 0.03, radius_bottom: 0.03, height: 0.45 },
                solid(0x3c8d2f),
                Instance::new(),
            )
            .part(
                "bloom",
                Shape::Sphere { radius: 0.12 },
                solid(0xe85d9e),
                Instance::at(0.0, 0.5, 0.0),
            ),
        SceneryCategory::Rocks => assembly.part(
            "rock",
            Shape::Sphere { radius: 0.6 },
            solid(0x8a8a8a),
            Instance::at(0.0, 0.4, 0.0),
        ),
        SceneryCategory::Grass => assembly.part(
            "tuft",
            Shape::Cone { radius: 0.25, height: 0.5 },
            solid(0x5aa03c),
            Instance::new(),
        ),
        SceneryCategory::Lanterns => assembly
            .part(
                "pole",
                Shape::Cylinder { radius_top: 0.06, radius_bottom: 0.08, height: 2.0 },
                solid(0x2b2b2b),
                Instance::new(),
            )
            .part(
                "lamp",
                Shape::Sphere { radius: 0.2 },
                Material::overlay(Color::from_hex(0xffd27a), 1.0),
                Instance::at(0.0, 2.15, 0.0),
            ),
        SceneryCategory::Mountains => assembly.part(
            "peak",
            Shape::Cone { radius: 14.0, height: 30.0 },
            solid(0x6d7582),
            Instance::new(),
        ),
        SceneryCategory::ScenicHouses => building(BuildingVariant::House, Color::from_hex(0xb59b7c)),
    }
}

/// Capsule-ish villager: body and head.
pub fn villager() -> Assembly {
    Assembly::new("villager (fallback)")
        .part(
            "body",
            Shape::Cylinder { radius_top: 0.25, radius_bottom: 0.35, height: 1.2 },
            solid(0x4a6fa5),
            Instance::new(),
        )
        .part(
            "head",
            Shape::Sphere { radius: 0.25 },
            solid(0xf1c27d),
            Instance::at(0.0, 1.45, 0.0),
        )
}

pub fn critter(kind: CritterKind) -> Assembly {
    let assembly = Assembly::new(kind.name());
    let wing = |assembly: Assembly, span: f32, hex: u32| {
        let material = Material::overlay(Color::from_hex(hex), 0.8);
        let shape = Shape::Box { width: span, height: 0.01, depth: span * 0.5 };
        assembly
            .part(WING, shape, material, Instance::at(-span / 2.0, 0.0, 0.0))
            .part(WING, shape, material, Instance::at(span / 2.0, 0.0, 0.0))
    };
    match kind {
        CritterKind::Fly => wing(
            assembly.part("body", Shape::Sphere { radius: 0.04 }, solid(0x1a1a1a), Instance::new()),
            0.06,
            0xdddddd,
        ),
        CritterKind::Bee => wing(
            assembly.part("body", Shape::Sphere { radius: 0.07 }, solid(0xf2c200), Instance::new()),
            0.1,
            0xeeeeff,
        ),
        CritterKind::Bird => wing(
            assembly.part("body", Shape::Sphere { radius: 0.18 }, solid(0x5a4632), Instance::new()),
            0.45,
            0x3e3024,
        ),
        CritterKind::Hummingbird => wing(
            assembly.part("body", Shape::Sphere { radius: 0.08 }, solid(0x1f9e74), Instance::new()),
            0.16,
            0x2ec4a0,
        ),
        CritterKind::Ant => assembly
            .part("body", Shape::Sphere { radius: 0.03 }, solid(0x2a1a12), Instance::new())
            .part(
                "head",
                Shape::Sphere { radius: 0.02 },
                solid(0x2a1a12),
                Instance::at(0.0, 0.0, 0.04),
            ),
        CritterKind::Leaf => assembly.part(
            "blade",
            Shape::Plane { width: 0.18, depth: 0.12 },
            Material::overlay(Color::from_hex(0xd9822b), 1.0),
            Instance::new(),
        ),
    }
}

pub fn raindrop() -> Node {
    Node::shape(
        "raindrop",
        Shape::Cylinder { radius_top: 0.01, radius_bottom: 0.01, height: 0.35 },
        Material::overlay(Color::from_hex(0x9ec9ff), 0.6),
    )
}
