//! Camera, projection and pointer rays.
//!
//! The camera is a yaw/pitch fly camera; the projection follows the viewport
//! size. Together they turn a pointer position in normalized device
//! coordinates into a world-space [`Ray`].

use cgmath::{
    Angle, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Transform, Vector3,
    Vector4, perspective,
};

use crate::data_structures::model::Aabb;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Pointer ray cast into the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit length.
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Builds the ray through `ndc` (x right, y up, both in `[-1, 1]`).
    pub fn from_ndc(camera: &Camera, projection: &Projection, ndc: (f32, f32)) -> Option<Ray> {
        let view_proj = projection.calc_matrix() * camera.calc_matrix();
        let inverse = view_proj.invert()?;
        let unproject = |z: f32| {
            let clip = inverse * Vector4::new(ndc.0, ndc.1, z, 1.0);
            (clip.w.abs() > f32::EPSILON).then(|| Point3::from_vec(clip.truncate() / clip.w))
        };
        let near = unproject(-1.0)?;
        let far = unproject(1.0)?;
        Some(Ray::new(near, far - near))
    }

    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction * distance
    }

    /// Distance along the ray to the first hit with `aabb` (slab test).
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            let (lo, hi) = (aabb.min[axis], aabb.max[axis]);
            if direction.abs() < 1e-8 {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let (mut t0, mut t1) = ((lo - origin) * inv, (hi - origin) * inv);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    /// Where the ray meets the horizontal plane `y = height`.
    pub fn intersect_floor(&self, height: f32) -> Option<Point3<f32>> {
        if self.direction.y.abs() < 1e-4 {
            return None;
        }
        let t = (height - self.origin.y) / self.direction.y;
        (t >= 0.0).then(|| self.at(t))
    }
}

/// Projects `point` into normalized device coordinates. `None` if it lies
/// behind the camera.
pub fn world_to_ndc(camera: &Camera, projection: &Projection, point: Point3<f32>) -> Option<(f32, f32)> {
    let view = camera.calc_matrix().transform_point(point);
    if view.z >= 0.0 {
        return None;
    }
    let clip = projection.calc_matrix() * view.to_homogeneous();
    if clip.w.abs() < f32::EPSILON {
        return None;
    }
    Some((clip.x / clip.w, clip.y / clip.w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;

    fn rig() -> (Camera, Projection) {
        (
            Camera::new((0.0, 30.0, 20.0), Deg(-90.0), Deg(-60.0)),
            Projection::new(1280, 720, Deg(45.0), 0.1, 500.0),
        )
    }

    #[test]
    fn ray_through_projected_point_hits_it() {
        let (camera, projection) = rig();
        let target = Point3::new(6.0, 1.0, -4.0);
        let ndc = world_to_ndc(&camera, &projection, target).unwrap();
        let ray = Ray::from_ndc(&camera, &projection, ndc).unwrap();
        let aabb = Aabb::new(target - Vector3::new(0.5, 0.5, 0.5), target + Vector3::new(0.5, 0.5, 0.5));
        assert!(ray.intersect_aabb(&aabb).is_some());
    }

    #[test]
    fn centre_ray_reaches_floor_in_front_of_camera() {
        let (camera, projection) = rig();
        let ray = Ray::from_ndc(&camera, &projection, (0.0, 0.0)).unwrap();
        let hit = ray.intersect_floor(0.0).unwrap();
        assert!(hit.z < 20.0);
        assert!(hit.x.abs() < 1e-3);
    }

    #[test]
    fn slab_test_misses_box_behind_origin() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let behind = Aabb::new(Point3::new(-3.0, -1.0, -1.0), Point3::new(-2.0, 1.0, 1.0));
        let ahead = Aabb::new(Point3::new(2.0, -1.0, -1.0), Point3::new(3.0, 1.0, 1.0));
        assert!(ray.intersect_aabb(&behind).is_none());
        assert_eq!(ray.intersect_aabb(&ahead), Some(2.0));
    }
}
