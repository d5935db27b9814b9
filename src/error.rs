//! Error taxonomy of the village core.
//!
//! None of these abort the scene. Each one is recovered where it happens
//! (fallback geometry, a skipped element, a villager forced back to idle)
//! and logged.

/// Failure to obtain a decoded model for a URL.
///
/// `Clone` because one in-flight load result is shared by every caller that
/// asked for the same URL.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssetError {
    /// Network, IO or decode failure for a single URL.
    #[error("failed to load asset {url}: {reason}")]
    LoadFailed { url: String, reason: String },

    /// Every candidate of a `load_first_available` call failed.
    #[error("no candidate asset could be loaded ({} attempts)", attempts.len())]
    NoneAvailable { attempts: Vec<AssetError> },

    /// `load_first_available` was called without any candidate.
    #[error("no asset candidates given")]
    EmptyCandidates,
}

/// No collision-free point was found within the attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum PlacementError {
    #[error("no free spot near ({x:.2}, {z:.2}) for radius {radius:.2} after {attempts} attempts")]
    Exhausted {
        x: f32,
        z: f32,
        radius: f32,
        attempts: usize,
    },
}

/// Programming invariant violations inside the simulation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),
}

/// Errors that can occur when reading or parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),

    /// Failed to parse JSON content.
    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),
}
