//! Camera state and per-frame uniform block
//!
//! The camera computes its view and projection matrices from the scene
//! configuration. The Vulkan backend owns the per-frame GPU buffers and
//! copies `CameraUniformBlock` into the frame slot's mapped memory once per
//! frame.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use crate::config::CameraConfig;

/// Per-frame camera uniform block (std140-compatible)
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniformBlock {
    /// World-to-view matrix
    pub view: Mat4,
    /// View-to-clip matrix (Vulkan clip space, y flipped)
    pub projection: Mat4,
    /// Eye position in world space (w unused)
    pub eye: Vec4,
}

/// Perspective camera.
///
/// Matrices are recomputed when the aspect ratio changes (window resize);
/// everything else is fixed by the scene configuration.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    look_at: Vec3,
    up: Vec3,
    fov_y: f32,
    aspect_ratio: f32,
    near: f32,
    far: f32,
    view: Mat4,
    projection: Mat4,
}

impl Camera {
    /// Build a camera from the scene configuration and an initial aspect ratio
    pub fn from_config(config: &CameraConfig, aspect_ratio: f32) -> Self {
        let mut camera = Self {
            position: Vec3::from_array(config.position),
            look_at: Vec3::from_array(config.look_at),
            up: Vec3::from_array(config.up).normalize_or_zero(),
            fov_y: config.fov_y_degrees.to_radians(),
            aspect_ratio,
            near: config.near,
            far: config.far,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.recompute();
        camera
    }

    /// Update the aspect ratio after a window resize
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.recompute();
    }

    /// Move the eye position (look-at target unchanged)
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.recompute();
    }

    /// Eye position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// View-to-clip matrix (Vulkan clip space)
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Uniform block for the current camera state
    pub fn uniform_block(&self) -> CameraUniformBlock {
        CameraUniformBlock {
            view: self.view,
            projection: self.projection,
            eye: self.position.extend(1.0),
        }
    }

    fn recompute(&mut self) {
        self.view = Mat4::look_at_rh(self.position, self.look_at, self.up);

        // Vulkan clip space: y points down, depth range [0, 1]
        let mut projection =
            Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.near, self.far);
        projection.y_axis.y *= -1.0;
        self.projection = projection;
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
