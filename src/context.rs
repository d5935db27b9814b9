use cgmath::Deg;

use crate::{
    camera::{self, Camera, Projection, Ray},
    data_structures::material::Color,
};

/// Pointer affordance requested from the host window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
    NotAllowed,
}

/// Viewport, camera and pointer state shared by the frame driver and the
/// interaction layer.
#[derive(Debug, Clone)]
pub struct Context {
    pub width: u32,
    pub height: u32,
    pub camera: Camera,
    pub projection: Projection,
    /// Last pointer position in normalized device coordinates.
    pub pointer: Option<(f32, f32)>,
    pub cursor: Cursor,
    pub clear_colour: Color,
}

impl Context {
    pub fn new(width: u32, height: u32) -> Self {
        // right/left, height, forward/backward - y axis rotation (turn head left/right) - x axis rotation (head up/down)
        let camera = Camera::new((0.0, 30.0, 20.0), Deg(-90.0), Deg(-60.0));
        let projection = Projection::new(width, height, Deg(45.0), 0.1, 500.0);
        Self {
            width,
            height,
            camera,
            projection,
            pointer: None,
            cursor: Cursor::Default,
            clear_colour: Color::from_hex(0x87ceeb),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
            self.projection.resize(width, height);
        }
    }

    pub fn pointer_ray(&self) -> Option<Ray> {
        Ray::from_ndc(&self.camera, &self.projection, self.pointer?)
    }

    /// Screen position in pixels of a world point, for anchoring UI labels.
    pub fn world_to_screen(&self, point: cgmath::Point3<f32>) -> Option<(f32, f32)> {
        let (x, y) = camera::world_to_ndc(&self.camera, &self.projection, point)?;
        Some((
            (x + 1.0) / 2.0 * self.width as f32,
            (1.0 - y) / 2.0 * self.height as f32,
        ))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}
