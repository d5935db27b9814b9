//! Decoded model data shared between placed instances.
//!
//! A `Model` is decoded once per URL and handed out as `Arc<Model>`; placing
//! it in the world only creates a new scene node that points at it.

use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::data_structures::instance::Instance;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Box of the given size whose base sits on y = 0, centred on x/z.
    pub fn grounded(width: f32, height: f32, depth: f32) -> Self {
        Self {
            min: Point3::new(-width / 2.0, 0.0, -depth / 2.0),
            max: Point3::new(width / 2.0, height, depth / 2.0),
        }
    }

    /// Box of the given size centred on the origin.
    pub fn centered(width: f32, height: f32, depth: f32) -> Self {
        Self {
            min: Point3::new(-width / 2.0, -height / 2.0, -depth / 2.0),
            max: Point3::new(width / 2.0, height / 2.0, depth / 2.0),
        }
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        self.min.midpoint(self.max)
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box after applying `transform`, re-aligned to the axes.
    pub fn transformed(&self, transform: &Instance) -> Aabb {
        Self::enclosing(self.corners().iter().map(|c| transform.transform_point(*c)))
            .unwrap_or(*self)
    }

    pub fn enclosing(points: impl IntoIterator<Item = Point3<f32>>) -> Option<Aabb> {
        points.into_iter().fold(None, |acc, p| {
            let point_box = Aabb::new(p, p);
            Some(match acc {
                Some(acc) => point_box.union(&acc),
                None => point_box,
            })
        })
    }
}

/// Name and length of an animation clip contained in a model.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipInfo {
    pub name: String,
    /// Seconds.
    pub duration: f32,
}

/// A decoded external model.
#[derive(Clone, Debug)]
pub struct Model {
    pub name: String,
    pub bounds: Aabb,
    pub clips: Vec<ClipInfo>,
    pub mesh_count: usize,
}

impl Model {
    pub fn new(name: impl Into<String>, bounds: Aabb) -> Self {
        Self {
            name: name.into(),
            bounds,
            clips: Vec::new(),
            mesh_count: 1,
        }
    }

    pub fn with_clips(mut self, clips: Vec<ClipInfo>) -> Self {
        self.clips = clips;
        self
    }

    /// Case-insensitive lookup of a clip whose name contains `needle`.
    pub fn find_clip(&self, needle: &str) -> Option<&ClipInfo> {
        let needle = needle.to_lowercase();
        self.clips
            .iter()
            .find(|clip| clip.name.to_lowercase().contains(&needle))
    }

    /// Local transform that uniformly rescales the model to `target_height`
    /// and moves its pivot so that it stands on y = `vertical_offset`,
    /// centred on x/z.
    pub fn fit_to_height(&self, target_height: f32, vertical_offset: f32) -> Instance {
        let size = self.bounds.size();
        let scale = if size.y > f32::EPSILON {
            target_height / size.y
        } else {
            1.0
        };
        let center = self.bounds.center();
        let scaled_height = size.y * scale;
        Instance {
            position: Vector3::new(
                -center.x * scale,
                -center.y * scale + scaled_height / 2.0 + vertical_offset,
                -center.z * scale,
            ),
            ..Instance::default()
        }
        .with_uniform_scale(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_to_height_puts_base_on_ground() {
        let model = Model::new(
            "tree",
            Aabb::new(Point3::new(-1.0, 2.0, -1.0), Point3::new(1.0, 6.0, 1.0)),
        );
        let fit = model.fit_to_height(8.0, 0.0);
        let placed = model.bounds.transformed(&fit);
        assert!((placed.size().y - 8.0).abs() < 1e-4);
        assert!(placed.min.y.abs() < 1e-4);
        assert!(placed.center().x.abs() < 1e-4);
    }

    #[test]
    fn flat_model_keeps_unit_scale() {
        let model = Model::new("decal", Aabb::new(Point3::origin(), Point3::new(1.0, 0.0, 1.0)));
        assert_eq!(model.fit_to_height(3.0, 0.0).scale.x, 1.0);
    }

    #[test]
    fn finds_clips_by_fragment() {
        let model = Model::new("villager", Aabb::grounded(1.0, 2.0, 1.0)).with_clips(vec![
            ClipInfo {
                name: "Armature|Idle_Loop".into(),
                duration: 2.0,
            },
            ClipInfo {
                name: "Armature|Walk".into(),
                duration: 1.0,
            },
        ]);
        assert_eq!(model.find_clip("walk").map(|c| c.duration), Some(1.0));
        assert!(model.find_clip("run").is_none());
    }
}
