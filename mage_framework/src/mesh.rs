//! Decoded asset data carriers
//!
//! Asset file parsing (OBJ/glTF/image codecs) is an external collaborator;
//! the framework consumes meshes and textures as already-decoded data. The
//! `builtin:` helpers exist so the demo and the tests do not need any parser.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Interleaved vertex layout consumed by the geometry pipeline
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Decoded mesh data (triangle list, 32-bit indices)
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Axis-aligned unit cube centered at the origin (24 vertices, 36 indices)
    pub fn unit_cube() -> Self {
        // One quad per face so each face gets its own normal and uv set
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            // (normal, tangent u, tangent v)
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (face, (normal, u_axis, v_axis)) in faces.iter().enumerate() {
            let corners = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];
            for (u, v) in corners {
                let position = [
                    normal[0] * 0.5 + u_axis[0] * u + v_axis[0] * v,
                    normal[1] * 0.5 + u_axis[1] * u + v_axis[1] * v,
                    normal[2] * 0.5 + u_axis[2] * u + v_axis[2] * v,
                ];
                vertices.push(Vertex {
                    position,
                    normal: *normal,
                    uv: [u + 0.5, v + 0.5],
                });
            }
            let base = (face * 4) as u32;
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }
}

/// Decoded RGBA8 texture data
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixels, row-major
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Two-tone checkerboard, `cell` pixels per square
    pub fn checkerboard(width: u32, height: u32, cell: u32) -> Self {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let dark = ((x / cell) + (y / cell)) % 2 == 0;
                let value = if dark { 60 } else { 220 };
                pixels.extend_from_slice(&[value, value, value, 255]);
            }
        }
        Self { width, height, pixels }
    }
}

/// Per-model uniform block written once per frame per frame slot
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelUniformBlock {
    /// Model-to-world matrix
    pub model: Mat4,
    /// Inverse-transpose of the model matrix for normal transformation
    pub normal: Mat4,
}

impl ModelUniformBlock {
    /// Derive both matrices from a model transform
    pub fn from_transform(model: Mat4) -> Self {
        Self {
            model,
            normal: model.inverse().transpose(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_cube_shape() {
        let cube = MeshData::unit_cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.indices.iter().all(|&i| (i as usize) < cube.vertices.len()));
    }

    #[test]
    fn test_unit_cube_extents() {
        let cube = MeshData::unit_cube();
        for vertex in &cube.vertices {
            for component in vertex.position {
                assert!(component >= -0.5 && component <= 0.5);
            }
        }
    }

    #[test]
    fn test_checkerboard_pixel_count() {
        let texture = TextureData::checkerboard(8, 4, 2);
        assert_eq!(texture.pixels.len(), 8 * 4 * 4);
    }

    #[test]
    fn test_model_uniform_block_identity() {
        let block = ModelUniformBlock::from_transform(Mat4::IDENTITY);
        assert_eq!(block.model, Mat4::IDENTITY);
        assert_eq!(block.normal, Mat4::IDENTITY);
    }

    #[test]
    fn test_vertex_stride() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }
}
