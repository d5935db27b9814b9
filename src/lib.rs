//! village-ngin
//!
//! The living core of a small village scene: buildings placed from an
//! external layout, decorations and villagers that respect each other's
//! space, ambient critters, and a day-night and weather cycle. Assets load
//! asynchronously and every element shows a procedural stand-in until its
//! model arrives or fails. Drawing is left to the host through
//! [`render::SceneRenderer`].
//!
//! High-level modules
//! - `camera`: camera, projection and pick rays
//! - `config`: serde configuration for layouts, catalog and tuning
//! - `context`: viewport, pointer and cursor state
//! - `data_structures`: transforms, models, materials, the scene graph and procedural stand-ins
//! - `error`: error types
//! - `flow`: the simulation context and frame loop
//! - `pick`: hover and click handling for buildings
//! - `placement`: collision zones and free-spot search
//! - `render`: frame collection for the host renderer
//! - `resources`: model loading, the asset cache and animation mixing
//! - `world`: buildings, scenery, villagers, critters and the environment
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod pick;
pub mod placement;
pub mod render;
pub mod resources;
pub mod world;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use flow::{FrameDriver, VillageSimulation, run_headless};
pub use pick::VillageObserver;
