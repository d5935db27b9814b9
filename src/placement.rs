//! Circular occupancy zones and collision-aware placement.
//!
//! Every building and decoration registers one [`CollisionZone`]. Candidate
//! positions are tested with a plain circle-circle overlap and, if taken,
//! relocated by a deterministic outward spiral.

use log::trace;

use crate::{config::SceneryCategory, error::PlacementError};

/// Golden angle in radians; successive samples never line up on a ray.
const GOLDEN_ANGLE: f32 = 2.399_963;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ZoneKind {
    Building,
    Scenery(SceneryCategory),
    VillageCenter,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionZone {
    pub x: f32,
    pub z: f32,
    pub radius: f32,
    pub kind: ZoneKind,
}

impl CollisionZone {
    pub fn new(x: f32, z: f32, radius: f32, kind: ZoneKind) -> Self {
        Self { x, z, radius, kind }
    }

    pub fn distance_to(&self, x: f32, z: f32) -> f32 {
        (self.x - x).hypot(self.z - z)
    }

    /// Whether a disc of `radius` at `(x, z)` overlaps this zone.
    pub fn overlaps(&self, x: f32, z: f32, radius: f32) -> bool {
        self.distance_to(x, z) < self.radius + radius
    }
}

#[derive(Clone, Debug, Default)]
pub struct PlacementValidator {
    zones: Vec<CollisionZone>,
}

impl PlacementValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_free(&self, x: f32, z: f32, radius: f32) -> bool {
        self.zones.iter().all(|zone| !zone.overlaps(x, z, radius))
    }

    /// Static zones plus every other villager disc, kept `buffer` apart.
    pub fn is_free_for_villager(
        &self,
        x: f32,
        z: f32,
        radius: f32,
        others: &[(f32, f32)],
        buffer: f32,
    ) -> bool {
        self.is_free(x, z, radius)
            && others
                .iter()
                .all(|(ox, oz)| (ox - x).hypot(oz - z) >= radius * 2.0 + buffer)
    }

    /// Tries `(x, z)` first, then up to `max_attempts` points on a growing
    /// golden-angle spiral around it.
    pub fn find_nearby_free(
        &self,
        x: f32,
        z: f32,
        radius: f32,
        max_attempts: usize,
    ) -> Result<(f32, f32), PlacementError> {
        if self.is_free(x, z, radius) {
            return Ok((x, z));
        }
        let step = (radius * 0.5).max(0.5);
        for attempt in 1..=max_attempts {
            let angle = attempt as f32 * GOLDEN_ANGLE;
            let distance = step * attempt as f32;
            let (cx, cz) = (x + angle.cos() * distance, z + angle.sin() * distance);
            if self.is_free(cx, cz, radius) {
                trace!("Relocated ({:.2}, {:.2}) to ({:.2}, {:.2})", x, z, cx, cz);
                return Ok((cx, cz));
            }
        }
        Err(PlacementError::Exhausted {
            x,
            z,
            radius,
            attempts: max_attempts,
        })
    }

    pub fn register_zone(&mut self, zone: CollisionZone) {
        self.zones.push(zone);
    }

    pub fn clear_zones(&mut self) {
        self.zones.clear();
    }

    pub fn zones(&self) -> &[CollisionZone] {
        &self.zones
    }

    pub fn count_by_kind(&self, kind: ZoneKind) -> usize {
        self.zones.iter().filter(|zone| zone.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_building_at_origin() -> PlacementValidator {
        let mut validator = PlacementValidator::new();
        validator.register_zone(CollisionZone::new(0.0, 0.0, 3.5, ZoneKind::Building));
        validator
    }

    #[test]
    fn touching_discs_are_free() {
        let validator = with_building_at_origin();
        assert!(!validator.is_free(4.0, 0.0, 1.0));
        assert!(validator.is_free(4.5, 0.0, 1.0));
    }

    #[test]
    fn free_point_is_returned_unchanged() {
        let validator = with_building_at_origin();
        assert_eq!(validator.find_nearby_free(10.0, 10.0, 1.0, 8), Ok((10.0, 10.0)));
    }

    #[test]
    fn blocked_point_moves_outside_every_zone() {
        let validator = with_building_at_origin();
        let (x, z) = validator.find_nearby_free(0.5, 0.0, 1.5, 32).unwrap();
        assert!(x.hypot(z) >= 5.0);
    }

    #[test]
    fn spiral_is_deterministic() {
        let validator = with_building_at_origin();
        assert_eq!(
            validator.find_nearby_free(1.0, 1.0, 1.0, 16),
            validator.find_nearby_free(1.0, 1.0, 1.0, 16)
        );
    }

    #[test]
    fn exhausted_search_reports_error() {
        let mut validator = PlacementValidator::new();
        validator.register_zone(CollisionZone::new(0.0, 0.0, 500.0, ZoneKind::VillageCenter));
        assert!(matches!(
            validator.find_nearby_free(0.0, 0.0, 1.0, 5),
            Err(PlacementError::Exhausted { attempts: 5, .. })
        ));
    }

    #[test]
    fn villagers_keep_apart() {
        let validator = PlacementValidator::new();
        let others = [(0.0, 0.0)];
        assert!(!validator.is_free_for_villager(1.0, 0.0, 0.5, &others, 0.3));
        assert!(validator.is_free_for_villager(1.4, 0.0, 0.5, &others, 0.3));
    }
}
