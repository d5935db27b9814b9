//! Per-node transformation data.
//!
//! Every node of the scene graph stores a local `Instance`; world transforms
//! are obtained by composing the chain of parents with `parent * local`.

use std::ops::Mul;

use cgmath::{EuclideanSpace, One, Rotation3};

/// Position, rotation (as quaternion) and scale of a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        cgmath::Vector3::new(x, y, z).into()
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.set_yaw(yaw);
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = cgmath::Vector3::new(scale, scale, scale);
        self
    }

    /// Rotation around the world up axis. Zero faces +Z.
    pub fn set_yaw(&mut self, yaw: f32) {
        self.rotation = cgmath::Quaternion::from_angle_y(cgmath::Rad(yaw));
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn transform_point(&self, point: cgmath::Point3<f32>) -> cgmath::Point3<f32> {
        let scaled = cgmath::Vector3::new(
            point.x * self.scale.x,
            point.y * self.scale.y,
            point.z * self.scale.z,
        );
        cgmath::Point3::from_vec(self.position + self.rotation * scaled)
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    fn mul(self, rhs: &'b Instance) -> Self::Output {
        let new_rotation = self.rotation * rhs.rotation;

        let new_scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let new_position = self.position + (self.rotation * scaled_rhs_pos);

        Instance {
            position: new_position,
            rotation: new_rotation,
            scale: new_scale,
        }
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_scale_and_translation_apply_to_child() {
        let parent = Instance::at(10.0, 0.0, 0.0).with_uniform_scale(2.0);
        let child = Instance::at(1.0, 1.0, 0.0);
        let world = parent * child;
        assert!((world.position.x - 12.0).abs() < 1e-5);
        assert!((world.position.y - 2.0).abs() < 1e-5);
        assert!((world.scale.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn yaw_rotates_forward_axis() {
        let facing_x = Instance::new().with_yaw(std::f32::consts::FRAC_PI_2);
        let p = facing_x.transform_point(cgmath::Point3::new(0.0, 0.0, 1.0));
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!(p.z.abs() < 1e-5);
    }
}
