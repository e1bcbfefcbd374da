//! Scene configuration loaded once at startup
//!
//! A single JSON document describes the camera, the model list (mesh/texture
//! paths and transforms) and the post-process stage lists. It is a read-only
//! input to scene and camera construction and is never mutated at runtime.

use std::path::{Path, PathBuf};
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Top-level scene description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Camera parameters
    pub camera: CameraConfig,

    /// Models to load into the scene
    #[serde(default)]
    pub models: Vec<ModelConfig>,

    /// Post-process stage lists (tonemap and final composite are implicit)
    #[serde(default)]
    pub post_process: PostProcessConfig,

    /// Directory containing compiled SPIR-V shader binaries
    #[serde(default = "default_shader_dir")]
    pub shader_dir: PathBuf,
}

fn default_shader_dir() -> PathBuf {
    PathBuf::from("shaders")
}

/// Camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Eye position in world space
    pub position: [f32; 3],
    /// Point the camera looks at
    pub look_at: [f32; 3],
    /// Up vector
    #[serde(default = "default_up")]
    pub up: [f32; 3],
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub fov_y_degrees: f32,
    /// Near clip plane distance
    #[serde(default = "default_near")]
    pub near: f32,
    /// Far clip plane distance
    #[serde(default = "default_far")]
    pub far: f32,
}

fn default_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_fov() -> f32 {
    60.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    100.0
}

/// One model entry: mesh/texture source plus initial transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Unique model name, used as the lookup key for descriptor sets
    pub name: String,
    /// Mesh source path (or a `builtin:` identifier resolved by the loader)
    pub mesh: String,
    /// Texture source path (or a `builtin:` identifier resolved by the loader)
    pub texture: String,
    /// Initial world transform
    #[serde(default)]
    pub transform: TransformConfig,
}

/// Decomposed transform (translation, rotation as XYZ euler degrees, scale)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default)]
    pub rotation_degrees: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            translation: [0.0, 0.0, 0.0],
            rotation_degrees: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

impl TransformConfig {
    /// Compose the transform into a model matrix (scale, then rotate, then translate)
    pub fn to_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            glam::EulerRot::XYZ,
            self.rotation_degrees[0].to_radians(),
            self.rotation_degrees[1].to_radians(),
            self.rotation_degrees[2].to_radians(),
        );
        Mat4::from_scale_rotation_translation(
            Vec3::from_array(self.scale),
            rotation,
            Vec3::from_array(self.translation),
        )
    }
}

/// Post-process stage lists.
///
/// High-resolution stages run before the tonemap pass on the 32-bit float
/// targets; low-resolution stages run after it on the 8-bit targets. The
/// tonemap pass and the final composite are always present and are not
/// listed here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostProcessConfig {
    #[serde(default)]
    pub high_res_stages: Vec<String>,
    #[serde(default)]
    pub low_res_stages: Vec<String>,
}

impl SceneConfig {
    /// Parse a scene configuration from a JSON string
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the document does not match the
    /// expected schema.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("Invalid scene configuration: {}", e)))
    }

    /// Load a scene configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and
    /// `Error::Configuration` if it does not parse.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("Failed to read '{}': {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
