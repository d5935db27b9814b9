//! Frame composition for the host renderer.
//!
//! The simulation owns no GPU state. Each frame it walks the scene graph and
//! hands a [`RenderFrame`] to a [`SceneRenderer`] supplied by the host. Items
//! come pre-batched: opaque first, then transparent, the order a forward
//! renderer draws them in.

use crate::{
    context::{Context, Cursor},
    data_structures::{
        instance::Instance,
        material::{Color, Material},
        scene_graph::{NodeId, SceneGraph, Visual},
    },
    world::{buildings::PointLight, environment::Lighting},
};

/// One visible node with its resolved world transform.
#[derive(Clone, Debug)]
pub struct RenderItem<'a> {
    pub node: NodeId,
    pub visual: &'a Visual,
    pub world: Instance,
    pub material: Material,
}

#[derive(Debug)]
pub struct RenderFrame<'a> {
    pub opaque: Vec<RenderItem<'a>>,
    pub transparent: Vec<RenderItem<'a>>,
    pub lights: Vec<PointLight>,
    pub lighting: Lighting,
    pub clear_colour: Color,
    pub cursor: Cursor,
}

impl<'a> RenderFrame<'a> {
    /// Collects every effectively visible node that has something to draw.
    pub fn collect(
        graph: &'a SceneGraph,
        ctx: &Context,
        lighting: Lighting,
        lights: impl Iterator<Item = PointLight>,
    ) -> Self {
        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        let mut stack: Vec<(NodeId, Instance)> = graph
            .roots()
            .iter()
            .rev()
            .map(|&root| (root, Instance::default()))
            .collect();
        while let Some((id, parent)) = stack.pop() {
            let Some(node) = graph.get(id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let world = &parent * &node.local;
            if !matches!(node.visual, Visual::Empty) {
                let item = RenderItem {
                    node: id,
                    visual: &node.visual,
                    world,
                    material: node.material,
                };
                if node.material.is_transparent() {
                    // Fully faded overlays draw nothing.
                    if node.material.opacity > 0.0 {
                        transparent.push(item);
                    }
                } else {
                    opaque.push(item);
                }
            }
            stack.extend(node.children().iter().rev().map(|&child| (child, world)));
        }
        Self {
            opaque,
            transparent,
            lights: lights.collect(),
            lighting,
            clear_colour: lighting.sky_color,
            cursor: ctx.cursor,
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &RenderItem<'a>> {
        self.opaque.iter().chain(self.transparent.iter())
    }

    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Host seam that turns a frame into pixels.
pub trait SceneRenderer {
    fn render(&mut self, frame: &RenderFrame<'_>);
}

/// Draws nothing. Used headless and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl SceneRenderer for NullRenderer {
    fn render(&mut self, _frame: &RenderFrame<'_>) {}
}
