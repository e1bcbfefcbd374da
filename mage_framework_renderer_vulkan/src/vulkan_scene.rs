/// SceneResources - GPU residency for the scene's models
///
/// Owns the vertex/index buffers, textures, per-model per-frame uniform
/// buffers, and per-model descriptor sets. Asset decoding happens outside;
/// this module receives `ModelAsset` values with decoded mesh and texture
/// data and puts them on the GPU.
///
/// Lookup methods return `Option`; a missing key is only an error where
/// the caller says so.

use ash::vk;
use glam::Mat4;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use mage_framework::mage::render::MAX_FRAMES_IN_FLIGHT;
use mage_framework::mage::{Error, MeshData, ModelUniformBlock, Result, TextureData};
use mage_framework::mage_info;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptors::{DescriptorRegistry, DslKind, PoolSizes};
use crate::vulkan_sampler::{SamplerCache, SamplerType};
use crate::vulkan_texture::Texture;

/// One model ready for upload: decoded data plus its initial transform
pub struct ModelAsset {
    pub name: String,
    pub mesh: MeshData,
    pub texture: TextureData,
    pub transform: Mat4,
}

/// GPU-resident state of one model
pub(crate) struct ModelResources {
    pub(crate) vertex_buffer: Buffer,
    pub(crate) index_buffer: Buffer,
    pub(crate) index_count: u32,
    /// One uniform buffer per frame in flight, persistently mapped
    uniform_buffers: Vec<Buffer>,
    /// One descriptor set per frame in flight
    descriptor_sets: Vec<vk::DescriptorSet>,
    texture: Texture,
    transform: Mat4,
}

/// GPU residency for the whole scene
pub struct SceneResources {
    models: FxHashMap<String, ModelResources>,
    /// Draw order (stable across frames; map iteration order is not)
    order: Vec<String>,
}

impl SceneResources {
    /// Upload every model's geometry and texture.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` on duplicate model names; buffer and
    /// texture creation failures propagate as fatal backend errors.
    pub(crate) fn from_assets(ctx: Arc<GpuContext>, assets: Vec<ModelAsset>) -> Result<Self> {
        let mut models = FxHashMap::default();
        let mut order = Vec::with_capacity(assets.len());

        for asset in assets {
            if models.contains_key(&asset.name) {
                return Err(Error::Configuration(format!(
                    "Duplicate model name '{}'",
                    asset.name
                )));
            }

            let vertex_bytes: &[u8] = bytemuck::cast_slice(&asset.mesh.vertices);
            let vertex_buffer = Buffer::new_device_local_with_data(
                ctx.clone(),
                vertex_bytes,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                &format!("{} vertices", asset.name),
            )?;

            let index_bytes: &[u8] = bytemuck::cast_slice(&asset.mesh.indices);
            let index_buffer = Buffer::new_device_local_with_data(
                ctx.clone(),
                index_bytes,
                vk::BufferUsageFlags::INDEX_BUFFER,
                &format!("{} indices", asset.name),
            )?;

            let uniform_buffers = (0..MAX_FRAMES_IN_FLIGHT)
                .map(|i| {
                    Buffer::new(
                        ctx.clone(),
                        std::mem::size_of::<ModelUniformBlock>() as u64,
                        vk::BufferUsageFlags::UNIFORM_BUFFER,
                        gpu_allocator::MemoryLocation::CpuToGpu,
                        &format!("{} ubo {}", asset.name, i),
                    )
                })
                .collect::<Result<Vec<_>>>()?;

            let texture = Texture::from_data(ctx.clone(), &asset.texture, &asset.name)?;

            mage_info!(
                "mage::Scene",
                "Model '{}' uploaded: {} vertices, {} indices",
                asset.name,
                asset.mesh.vertices.len(),
                asset.mesh.indices.len()
            );

            order.push(asset.name.clone());
            models.insert(
                asset.name,
                ModelResources {
                    vertex_buffer,
                    index_buffer,
                    index_count: asset.mesh.indices.len() as u32,
                    uniform_buffers,
                    descriptor_sets: Vec::new(),
                    texture,
                    transform: asset.transform,
                },
            );
        }

        Ok(Self { models, order })
    }

    /// Add this scene's requirements to the descriptor pool sizing
    pub fn expand_descriptor_pool(&self, sizes: &mut PoolSizes) {
        let model_count = self.models.len() as u32;
        let frames = MAX_FRAMES_IN_FLIGHT as u32;
        sizes.add(PoolSizes {
            uniform_buffers: model_count * frames,
            combined_image_samplers: model_count * frames,
            storage_images: 0,
            sets: model_count * frames,
        });
    }

    /// Allocate the per-model per-frame descriptor sets
    pub(crate) fn create_descriptors(&mut self, registry: &mut DescriptorRegistry) -> Result<()> {
        for name in &self.order {
            let model = self.models.get_mut(name).unwrap();
            model.descriptor_sets = registry.allocate_per_frame_sets(DslKind::Model)?;
        }
        Ok(())
    }

    /// Point every set at its slot's uniform buffer and the model's texture.
    ///
    /// Sets are written only after all dependent resources exist; called at
    /// initialization and again after a resize rebuild.
    pub(crate) fn write_descriptor_sets(
        &self,
        registry: &DescriptorRegistry,
        samplers: &mut SamplerCache,
    ) -> Result<()> {
        let sampler = samplers.get(SamplerType::LinearRepeat);
        for model in self.models.values() {
            for (set, buffer) in model.descriptor_sets.iter().zip(&model.uniform_buffers) {
                registry.write_uniform_buffer(
                    *set,
                    0,
                    buffer.handle(),
                    std::mem::size_of::<ModelUniformBlock>() as u64,
                );
                registry.write_combined_image(
                    *set,
                    1,
                    model.texture.view(),
                    sampler,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                );
            }
        }
        Ok(())
    }

    /// Write every model's uniform block for the frame slot.
    ///
    /// Models spin slowly around Y so motion is visible; the configured
    /// transform is the rest pose.
    pub fn update_uniforms(&self, frame_slot: usize, elapsed_secs: f32) -> Result<()> {
        let spin = Mat4::from_rotation_y(elapsed_secs * 0.4);
        for model in self.models.values() {
            let block = ModelUniformBlock::from_transform(model.transform * spin);
            model.uniform_buffers[frame_slot].write_pod(&block)?;
        }
        Ok(())
    }

    /// Descriptor set lookup: only `DslKind::Model` sets live here
    pub fn descriptor_set(
        &self,
        kind: DslKind,
        frame_slot: usize,
        key: &str,
    ) -> Option<vk::DescriptorSet> {
        match kind {
            DslKind::Model => self
                .models
                .get(key)
                .and_then(|m| m.descriptor_sets.get(frame_slot))
                .copied(),
            _ => None,
        }
    }

    /// Texture lookup by model name
    pub fn texture(&self, name: &str) -> Option<&Texture> {
        self.models.get(name).map(|m| &m.texture)
    }

    /// Model names in draw order
    pub fn model_names(&self) -> &[String] {
        &self.order
    }

    /// Number of models
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Models in draw order, with their names
    pub(crate) fn models_in_order(&self) -> impl Iterator<Item = (&str, &ModelResources)> {
        self.order
            .iter()
            .map(|name| (name.as_str(), &self.models[name]))
    }

    /// The slot's descriptor set for a model, as a hard requirement
    pub(crate) fn require_descriptor_set(
        &self,
        frame_slot: usize,
        key: &str,
    ) -> Result<vk::DescriptorSet> {
        self.descriptor_set(DslKind::Model, frame_slot, key)
            .ok_or_else(|| Error::ResourceNotFound(format!("model descriptor set '{}'", key)))
    }
}
