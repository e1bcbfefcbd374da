/// SamplerCache: internal VkSampler management for the Vulkan backend
///
/// Creates and caches VkSampler objects on first use. The frame pipeline
/// only ever needs a handful of samplers (scene textures, post-process
/// source sampling), so this stays tiny.

use ash::vk;
use std::collections::HashMap;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// The closed set of samplers the pipeline uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SamplerType {
    /// Trilinear with repeat addressing (scene textures)
    LinearRepeat,
    /// Bilinear clamped to edge (post-process source sampling)
    LinearClamp,
}

/// Internal sampler cache: creates VkSampler on first use, destroys on drop
pub(crate) struct SamplerCache {
    ctx: Arc<GpuContext>,
    cache: HashMap<SamplerType, vk::Sampler>,
}

impl SamplerCache {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Self {
        Self {
            ctx,
            cache: HashMap::new(),
        }
    }

    /// Get or create a VkSampler for the given type
    pub(crate) fn get(&mut self, sampler_type: SamplerType) -> vk::Sampler {
        if let Some(&sampler) = self.cache.get(&sampler_type) {
            return sampler;
        }

        let sampler = Self::create_vk_sampler(&self.ctx, sampler_type);
        self.cache.insert(sampler_type, sampler);
        sampler
    }

    fn create_vk_sampler(ctx: &GpuContext, sampler_type: SamplerType) -> vk::Sampler {
        let (filter, mipmap, address, anisotropy) = match sampler_type {
            SamplerType::LinearRepeat => (
                vk::Filter::LINEAR,
                vk::SamplerMipmapMode::LINEAR,
                vk::SamplerAddressMode::REPEAT,
                Some(16.0),
            ),
            SamplerType::LinearClamp => (
                vk::Filter::LINEAR,
                vk::SamplerMipmapMode::NEAREST,
                vk::SamplerAddressMode::CLAMP_TO_EDGE,
                None,
            ),
        };

        let mut create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter)
            .min_filter(filter)
            .mipmap_mode(mipmap)
            .address_mode_u(address)
            .address_mode_v(address)
            .address_mode_w(address)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS);

        if let Some(max_aniso) = anisotropy {
            create_info = create_info.anisotropy_enable(true).max_anisotropy(max_aniso);
        } else {
            create_info = create_info.anisotropy_enable(false).max_anisotropy(1.0);
        }

        unsafe {
            ctx.device
                .create_sampler(&create_info, None)
                .expect("Failed to create VkSampler")
        }
    }
}

impl Drop for SamplerCache {
    fn drop(&mut self) {
        for (_, sampler) in self.cache.drain() {
            unsafe {
                self.ctx.device.destroy_sampler(sampler, None);
            }
        }
    }
}
