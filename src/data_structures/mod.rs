//! Engine data structures: transforms, models, materials and the scene graph.
//!
//! - `instance` holds per-node transformation data
//! - `model` contains decoded model data (bounds, animation clips) shared by `Arc`
//! - `material` has colours and surface parameters
//! - `scene_graph` enables hierarchical scene organization with generational handles
//! - `procedural` builds primitive stand-ins for assets that are missing or still loading

pub mod instance;
pub mod material;
pub mod model;
pub mod procedural;
pub mod scene_graph;
