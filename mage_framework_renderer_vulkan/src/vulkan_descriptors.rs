/// DescriptorRegistry - pool sizing, set layouts, and per-frame set writes
///
/// Every logical resource the shaders see (camera, time, per-model data,
/// compute image, post-process sources) has a descriptor-set-layout kind in
/// the closed `DslKind` set. A layout is created exactly once per kind and
/// reused by all frame-specific sets; lookups return `Option`; a miss is
/// not an error here, callers decide whether it is fatal.

use ash::vk;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use mage_framework::mage::render::MAX_FRAMES_IN_FLIGHT;
use mage_framework::mage::{Error, Result};
use mage_framework::{mage_err, mage_info};

use crate::vulkan_context::GpuContext;

/// The closed set of descriptor-set-layout kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DslKind {
    /// Camera view/projection uniform
    Camera,
    /// Per-model transform uniform + albedo texture
    Model,
    /// Time/jitter uniform
    Time,
    /// Compute storage image (written by compute, sampled by the composite)
    ComputeImage,
    /// Geometry color input of the compute-composite pass
    Composite,
    /// Sampled source of one post-process stage, by stage index
    PostProcess(u32),
}

/// Aggregated descriptor pool capacity.
///
/// Scene, camera, time and the pass graph each add their requirements
/// before the pool is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSizes {
    pub uniform_buffers: u32,
    pub combined_image_samplers: u32,
    pub storage_images: u32,
    pub sets: u32,
}

impl PoolSizes {
    /// Add another contribution to this pool requirement
    pub fn add(&mut self, other: PoolSizes) {
        self.uniform_buffers += other.uniform_buffers;
        self.combined_image_samplers += other.combined_image_samplers;
        self.storage_images += other.storage_images;
        self.sets += other.sets;
    }
}

/// The standard bindings of each layout kind.
///
/// This table is the single source of truth for what each set contains;
/// the pipeline factory and the recorders both derive from it.
pub(crate) fn standard_bindings(kind: DslKind) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    match kind {
        DslKind::Camera => vec![vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)],
        DslKind::Model => vec![
            vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX),
            vk::DescriptorSetLayoutBinding::default()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        ],
        DslKind::Time => vec![vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(
                vk::ShaderStageFlags::VERTEX
                    | vk::ShaderStageFlags::FRAGMENT
                    | vk::ShaderStageFlags::COMPUTE,
            )],
        DslKind::ComputeImage => vec![
            vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::COMPUTE),
            vk::DescriptorSetLayoutBinding::default()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        ],
        DslKind::Composite => vec![vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)],
        DslKind::PostProcess(_) => vec![vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)],
    }
}

/// Descriptor pool + layout registry
pub struct DescriptorRegistry {
    ctx: Arc<GpuContext>,
    pools: Vec<vk::DescriptorPool>,
    pool_sizes: PoolSizes,
    layouts: FxHashMap<DslKind, vk::DescriptorSetLayout>,
}

impl DescriptorRegistry {
    /// Create the registry with an initial pool sized from the aggregated
    /// requirements
    pub(crate) fn new(ctx: Arc<GpuContext>, sizes: PoolSizes) -> Result<Self> {
        let pool = Self::create_pool(&ctx.device, sizes)?;
        Ok(Self {
            ctx,
            pools: vec![pool],
            pool_sizes: sizes,
            layouts: FxHashMap::default(),
        })
    }

    fn create_pool(device: &ash::Device, sizes: PoolSizes) -> Result<vk::DescriptorPool> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: sizes.uniform_buffers.max(1),
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: sizes.combined_image_samplers.max(1),
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_IMAGE,
                descriptor_count: sizes.storage_images.max(1),
            },
        ];
        let info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(sizes.sets.max(1));

        unsafe {
            device
                .create_descriptor_pool(&info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create descriptor pool: {:?}", e))
        }
    }

    /// Create the layout for a kind; each kind is created exactly once.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the layout already exists.
    pub(crate) fn create_layout(&mut self, kind: DslKind) -> Result<vk::DescriptorSetLayout> {
        if self.layouts.contains_key(&kind) {
            return Err(Error::Configuration(format!(
                "Descriptor set layout {:?} created twice",
                kind
            )));
        }

        let bindings = standard_bindings(kind);
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

        let layout = unsafe {
            self.ctx
                .device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create descriptor set layout {:?}: {:?}", kind, e))?
        };

        self.layouts.insert(kind, layout);
        Ok(layout)
    }

    /// Look up a layout; `None` when the kind has not been created
    pub fn layout(&self, kind: DslKind) -> Option<vk::DescriptorSetLayout> {
        self.layouts.get(&kind).copied()
    }

    /// Layout lookup that treats a miss as a configuration defect
    pub(crate) fn require_layout(&self, kind: DslKind) -> Result<vk::DescriptorSetLayout> {
        self.layout(kind).ok_or_else(|| {
            Error::Configuration(format!("Descriptor set layout {:?} was never created", kind))
        })
    }

    /// Allocate one descriptor set per frame in flight for a kind
    pub(crate) fn allocate_per_frame_sets(
        &mut self,
        kind: DslKind,
    ) -> Result<Vec<vk::DescriptorSet>> {
        let layout = self.require_layout(kind)?;
        self.allocate_sets(layout, MAX_FRAMES_IN_FLIGHT)
    }

    /// Allocate `count` sets with the same layout, growing the pool when the
    /// current one is exhausted
    pub(crate) fn allocate_sets(
        &mut self,
        layout: vk::DescriptorSetLayout,
        count: usize,
    ) -> Result<Vec<vk::DescriptorSet>> {
        let layouts = vec![layout; count];
        let current_pool = *self.pools.last().unwrap();

        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(current_pool)
            .set_layouts(&layouts);

        unsafe {
            match self.ctx.device.allocate_descriptor_sets(&allocate_info) {
                Ok(sets) => Ok(sets),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY)
                | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                    let new_pool = Self::create_pool(&self.ctx.device, self.pool_sizes)?;
                    self.pools.push(new_pool);
                    mage_info!(
                        "mage::vulkan",
                        "Descriptor pool exhausted, created new pool (total: {})",
                        self.pools.len()
                    );
                    let retry_info = vk::DescriptorSetAllocateInfo::default()
                        .descriptor_pool(new_pool)
                        .set_layouts(&layouts);
                    self.ctx
                        .device
                        .allocate_descriptor_sets(&retry_info)
                        .map_err(|e| mage_err!("mage::vulkan", "Failed to allocate descriptor sets after pool growth: {:?}", e))
                }
                Err(e) => Err(mage_err!("mage::vulkan", "Failed to allocate descriptor sets: {:?}", e)),
            }
        }
    }

    // ===== WRITE HELPERS =====

    /// Point a uniform-buffer binding at a buffer
    pub(crate) fn write_uniform_buffer(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        buffer: vk::Buffer,
        range: u64,
    ) {
        let buffer_info = vk::DescriptorBufferInfo::default()
            .buffer(buffer)
            .offset(0)
            .range(range);

        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(std::slice::from_ref(&buffer_info));

        unsafe {
            self.ctx.device.update_descriptor_sets(&[write], &[]);
        }
    }

    /// Point a combined-image-sampler binding at a view
    pub(crate) fn write_combined_image(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        view: vk::ImageView,
        sampler: vk::Sampler,
        layout: vk::ImageLayout,
    ) {
        let image_info = vk::DescriptorImageInfo::default()
            .image_layout(layout)
            .image_view(view)
            .sampler(sampler);

        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(std::slice::from_ref(&image_info));

        unsafe {
            self.ctx.device.update_descriptor_sets(&[write], &[]);
        }
    }

    /// Point a storage-image binding at a view (GENERAL layout)
    pub(crate) fn write_storage_image(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        view: vk::ImageView,
    ) {
        let image_info = vk::DescriptorImageInfo::default()
            .image_layout(vk::ImageLayout::GENERAL)
            .image_view(view);

        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
            .image_info(std::slice::from_ref(&image_info));

        unsafe {
            self.ctx.device.update_descriptor_sets(&[write], &[]);
        }
    }
}

impl Drop for DescriptorRegistry {
    fn drop(&mut self) {
        unsafe {
            for (_, layout) in self.layouts.drain() {
                self.ctx.device.destroy_descriptor_set_layout(layout, None);
            }
            for pool in self.pools.drain(..) {
                self.ctx.device.destroy_descriptor_pool(pool, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_sizes_accumulate() {
        let mut sizes = PoolSizes::default();
        sizes.add(PoolSizes {
            uniform_buffers: 3,
            combined_image_samplers: 1,
            storage_images: 0,
            sets: 3,
        });
        sizes.add(PoolSizes {
            uniform_buffers: 6,
            combined_image_samplers: 3,
            storage_images: 3,
            sets: 6,
        });
        assert_eq!(
            sizes,
            PoolSizes {
                uniform_buffers: 9,
                combined_image_samplers: 4,
                storage_images: 3,
                sets: 9,
            }
        );
    }

    #[test]
    fn test_standard_bindings_shapes() {
        assert_eq!(standard_bindings(DslKind::Camera).len(), 1);
        assert_eq!(standard_bindings(DslKind::Model).len(), 2);
        assert_eq!(standard_bindings(DslKind::Time).len(), 1);
        assert_eq!(standard_bindings(DslKind::ComputeImage).len(), 2);
        assert_eq!(standard_bindings(DslKind::Composite).len(), 1);
        assert_eq!(standard_bindings(DslKind::PostProcess(0)).len(), 1);
    }

    #[test]
    fn test_post_process_kinds_are_distinct_keys() {
        let mut map = FxHashMap::default();
        map.insert(DslKind::PostProcess(0), 0u32);
        map.insert(DslKind::PostProcess(1), 1u32);
        assert_eq!(map.len(), 2);
        assert_ne!(DslKind::PostProcess(0), DslKind::PostProcess(1));
    }

    #[test]
    fn test_model_bindings_carry_albedo_sampler() {
        let bindings = standard_bindings(DslKind::Model);
        assert_eq!(bindings[1].descriptor_type, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(bindings[1].binding, 1);
    }
}
