//! Scene graph and hierarchical scene organization.
//!
//! The scene is an arena of nodes addressed by generational [`NodeId`]s.
//! A node owns its local transform and children; its [`Visual`] either is a
//! small procedural shape or points at a shared, cached [`Model`]. Removing
//! a node frees its whole subtree, and any handle still pointing into that
//! subtree simply stops resolving.

use std::sync::Arc;

use log::warn;

use crate::data_structures::{
    instance::Instance,
    material::Material,
    model::{Aabb, Model},
    procedural::Assembly,
};

/// Handle into the [`SceneGraph`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Marks the root of something the interaction layer can resolve a pick to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Building(usize),
}

/// Primitive procedural geometry. Sizes are in world units, bases at y = 0
/// unless noted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Box { width: f32, height: f32, depth: f32 },
    Cylinder { radius_top: f32, radius_bottom: f32, height: f32 },
    Cone { radius: f32, height: f32 },
    /// Centred on the origin.
    Sphere { radius: f32 },
    /// Flat quad on the x/z plane.
    Plane { width: f32, depth: f32 },
}

impl Shape {
    pub fn bounds(&self) -> Aabb {
        match *self {
            Shape::Box {
                width,
                height,
                depth,
            } => Aabb::grounded(width, height, depth),
            Shape::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => {
                let r = radius_top.max(radius_bottom);
                Aabb::grounded(r * 2.0, height, r * 2.0)
            }
            Shape::Cone { radius, height } => Aabb::grounded(radius * 2.0, height, radius * 2.0),
            Shape::Sphere { radius } => Aabb::centered(radius * 2.0, radius * 2.0, radius * 2.0),
            Shape::Plane { width, depth } => Aabb::grounded(width, 0.0, depth),
        }
    }
}

/// What a node draws.
#[derive(Clone, Debug, Default)]
pub enum Visual {
    #[default]
    Empty,
    Procedural(Shape),
    Model(Arc<Model>),
}

impl Visual {
    pub fn local_bounds(&self) -> Option<Aabb> {
        match self {
            Visual::Empty => None,
            Visual::Procedural(shape) => Some(shape.bounds()),
            Visual::Model(model) => Some(model.bounds),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub local: Instance,
    pub visible: bool,
    pub visual: Visual,
    pub material: Material,
    pub tag: Option<NodeTag>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local: Instance::default(),
            visible: true,
            visual: Visual::Empty,
            material: Material::default(),
            tag: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn shape(name: impl Into<String>, shape: Shape, material: Material) -> Self {
        Self {
            visual: Visual::Procedural(shape),
            material,
            ..Self::new(name)
        }
    }

    pub fn model(name: impl Into<String>, model: Arc<Model>) -> Self {
        Self {
            visual: Visual::Model(model),
            ..Self::new(name)
        }
    }

    pub fn with_local(mut self, local: Instance) -> Self {
        self.local = local;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn tagged(mut self, tag: NodeTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena owning every node of the scene.
#[derive(Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
    live: usize,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `node` under `parent` (or as a root). Returns `None` when the
    /// parent handle no longer resolves.
    pub fn insert(&mut self, node: Node, parent: Option<NodeId>) -> Option<NodeId> {
        if let Some(parent) = parent {
            if !self.contains(parent) {
                warn!("Tried to attach {} to a removed parent node.", node.name);
                return None;
            }
        }
        Some(self.alloc(node, parent))
    }

    pub fn add_root(&mut self, node: Node) -> NodeId {
        self.alloc(node, None)
    }

    fn alloc(&mut self, mut node: Node, parent: Option<NodeId>) -> NodeId {
        node.parent = parent;
        node.children.clear();
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        match parent.and_then(|parent| self.get_mut(parent)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Removes `id` and its whole subtree. Returns the number of freed nodes.
    pub fn remove(&mut self, id: NodeId) -> usize {
        let Some(parent) = self.get(id).map(Node::parent) else {
            return 0;
        };
        match parent.and_then(|parent| self.get_mut(parent)) {
            Some(parent) => parent.children.retain(|child| *child != id),
            None => self.roots.retain(|root| *root != id),
        }
        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index as usize];
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                self.live -= 1;
                freed += 1;
            }
        }
        freed
    }

    pub fn clear(&mut self) {
        let roots = self.roots.clone();
        for root in roots {
            self.remove(root);
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn set_local(&mut self, id: NodeId, local: Instance) {
        if let Some(node) = self.get_mut(id) {
            node.local = local;
        }
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.get_mut(id) {
            node.visible = visible;
        }
    }

    pub fn world_transform(&self, id: NodeId) -> Option<Instance> {
        let mut node = self.get(id)?;
        let mut world = node.local;
        while let Some(parent) = node.parent.and_then(|parent| self.get(parent)) {
            world = &parent.local * &world;
            node = parent;
        }
        Some(world)
    }

    /// A node is drawn only if it and all of its ancestors are visible.
    pub fn is_effectively_visible(&self, id: NodeId) -> bool {
        let mut current = self.get(id);
        while let Some(node) = current {
            if !node.visible {
                return false;
            }
            current = node.parent.and_then(|parent| self.get(parent));
        }
        true
    }

    /// Walks up from `id` (inclusive) to the first tagged ancestor.
    pub fn find_tag(&self, id: NodeId) -> Option<NodeTag> {
        let mut current = self.get(id);
        while let Some(node) = current {
            if node.tag.is_some() {
                return node.tag;
            }
            current = node.parent.and_then(|parent| self.get(parent));
        }
        None
    }

    /// `id` followed by all of its descendants, depth first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get(current) {
                out.push(current);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// World-space bounds of the visible geometry under `id`.
    pub fn world_bounds(&self, id: NodeId) -> Option<Aabb> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.is_effectively_visible(*node))
            .filter_map(|node| {
                let bounds = self.get(node)?.visual.local_bounds()?;
                Some(bounds.transformed(&self.world_transform(node)?))
            })
            .reduce(|a, b| a.union(&b))
    }
}

/// Resolution state of a visual that starts as a procedural fallback and is
/// replaced by a loaded asset once it arrives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Pending { fallback: NodeId },
    Ready { asset: NodeId },
    /// The load failed; the fallback stays for good.
    Fallback { fallback: NodeId },
}

/// A wrapper node whose single visual child is swapped on load completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisualSlot {
    pub wrapper: NodeId,
    pub state: SlotState,
}

impl VisualSlot {
    /// Attaches `fallback` under `wrapper`. The fallback is shown while the
    /// asset is pending only if `show_while_pending` is set.
    pub fn pending(
        graph: &mut SceneGraph,
        wrapper: NodeId,
        fallback: Assembly,
        show_while_pending: bool,
    ) -> Option<Self> {
        let mut fallback = fallback;
        fallback.root.visible = show_while_pending;
        let fallback = fallback.attach(graph, Some(wrapper))?;
        Some(Self {
            wrapper,
            state: SlotState::Pending { fallback },
        })
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self.state, SlotState::Pending { .. })
    }

    /// Swaps the fallback for `model` placed with `fit`. Returns `false` and
    /// leaves the graph untouched when the wrapper is gone or the slot was
    /// already settled.
    pub fn resolve(
        &mut self,
        graph: &mut SceneGraph,
        model: Arc<Model>,
        fit: Instance,
    ) -> bool {
        let SlotState::Pending { fallback } = self.state else {
            return false;
        };
        if !graph.contains(self.wrapper) {
            return false;
        }
        let name = format!("{} (asset)", model.name);
        let Some(asset) = graph.insert(Node::model(name, model).with_local(fit), Some(self.wrapper))
        else {
            return false;
        };
        graph.remove(fallback);
        self.state = SlotState::Ready { asset };
        true
    }

    /// Gives up on the asset and reveals the fallback.
    pub fn fail(&mut self, graph: &mut SceneGraph) -> bool {
        let SlotState::Pending { fallback } = self.state else {
            return false;
        };
        graph.set_visible(fallback, true);
        self.state = SlotState::Fallback { fallback };
        graph.contains(self.wrapper)
    }

    pub fn visual_node(&self) -> NodeId {
        match self.state {
            SlotState::Pending { fallback } | SlotState::Fallback { fallback } => fallback,
            SlotState::Ready { asset } => asset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::material::Color;

    fn cube() -> Node {
        Node::shape(
            "cube",
            Shape::Box {
                width: 1.0,
                height: 1.0,
                depth: 1.0,
            },
            Material::solid(Color::WHITE),
        )
    }

    #[test]
    fn removing_a_subtree_invalidates_handles() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root(Node::new("root"));
        let child = graph.insert(cube(), Some(root)).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.remove(root), 2);
        assert!(graph.is_empty());
        assert!(graph.get(child).is_none());

        // slot reuse must not resurrect the old handle
        let reused = graph.add_root(Node::new("other"));
        assert!(graph.get(child).is_none());
        assert!(graph.get(reused).is_some());
    }

    #[test]
    fn world_transform_composes_parents() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root(Node::new("root").with_local(Instance::at(5.0, 0.0, 0.0)));
        let child = graph
            .insert(cube().with_local(Instance::at(0.0, 2.0, 0.0)), Some(root))
            .unwrap();
        let world = graph.world_transform(child).unwrap();
        assert_eq!(world.position, cgmath::Vector3::new(5.0, 2.0, 0.0));
    }

    #[test]
    fn tag_is_found_from_a_deep_child() {
        let mut graph = SceneGraph::new();
        let root = graph.add_root(Node::new("building").tagged(NodeTag::Building(3)));
        let mid = graph.insert(Node::new("wrapper"), Some(root)).unwrap();
        let leaf = graph.insert(cube(), Some(mid)).unwrap();
        assert_eq!(graph.find_tag(leaf), Some(NodeTag::Building(3)));
    }

    #[test]
    fn slot_swaps_fallback_for_asset() {
        let mut graph = SceneGraph::new();
        let wrapper = graph.add_root(Node::new("wrapper"));
        let mut slot = VisualSlot::pending(&mut graph, wrapper, Assembly::single(cube()), false).unwrap();
        let model = Arc::new(Model::new("house", Aabb::grounded(2.0, 2.0, 2.0)));
        assert!(slot.resolve(&mut graph, model, Instance::default()));
        assert!(matches!(slot.state, SlotState::Ready { .. }));
        assert_eq!(graph.len(), 2);
        assert!(!slot.fail(&mut graph));
    }

    #[test]
    fn slot_ignores_results_after_wrapper_removal() {
        let mut graph = SceneGraph::new();
        let wrapper = graph.add_root(Node::new("wrapper"));
        let mut slot = VisualSlot::pending(&mut graph, wrapper, Assembly::single(cube()), true).unwrap();
        graph.remove(wrapper);
        let model = Arc::new(Model::new("house", Aabb::grounded(2.0, 2.0, 2.0)));
        assert!(!slot.resolve(&mut graph, model, Instance::default()));
        assert!(graph.is_empty());
    }
}
