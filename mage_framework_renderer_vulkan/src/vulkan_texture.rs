/// Textures and framebuffer attachments
///
/// Both types own {image, allocation, view} as a unit: the three are created
/// together and destroyed together in reverse order, and a failure partway
/// through construction releases what was already created. There are no
/// partial states.

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use mage_framework::mage::render::ImageLayout;
use mage_framework::mage::{Result, TextureData};
use mage_framework::mage_err;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_transitions::record_transition;

/// Offscreen render target attachment: {image, memory, view, format}.
///
/// Owned exclusively by the render-pass graph stage that created it;
/// destroyed on cleanup/resize.
pub(crate) struct FrameBufferAttachment {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    allocation: Option<Allocation>,
    pub(crate) view: vk::ImageView,
    pub(crate) format: vk::Format,
    pub(crate) extent: vk::Extent2D,
}

impl FrameBufferAttachment {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect_mask: vk::ImageAspectFlags,
        name: &str,
    ) -> Result<Self> {
        let (image, allocation) = create_image(
            &ctx,
            extent,
            format,
            usage,
            1,
            name,
        )?;

        let view = match create_view(&ctx, image, format, aspect_mask, 1) {
            Ok(view) => view,
            Err(e) => {
                destroy_image(&ctx, image, allocation);
                return Err(e);
            }
        };

        Ok(Self {
            ctx,
            image,
            allocation: Some(allocation),
            view,
            format,
            extent,
        })
    }
}

impl Drop for FrameBufferAttachment {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}

/// Sampled texture uploaded from decoded RGBA8 data, with a full mip chain
pub struct Texture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    allocation: Option<Allocation>,
    pub(crate) view: vk::ImageView,
    pub(crate) mip_levels: u32,
    width: u32,
    height: u32,
}

impl Texture {
    /// Upload decoded RGBA8 pixels and generate mips.
    ///
    /// Staging path: copy pixels into a CPU-visible staging buffer,
    /// transition the image to TransferDst, copy, then blit the mip chain
    /// down and finish every level in ShaderReadOnly.
    pub(crate) fn from_data(ctx: Arc<GpuContext>, data: &TextureData, name: &str) -> Result<Self> {
        let mip_levels = mip_level_count(data.width, data.height);
        let extent = vk::Extent2D {
            width: data.width,
            height: data.height,
        };

        let (image, allocation) = create_image(
            &ctx,
            extent,
            vk::Format::R8G8B8A8_SRGB,
            vk::ImageUsageFlags::SAMPLED
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::TRANSFER_SRC,
            mip_levels,
            name,
        )?;

        let view = match create_view(
            &ctx,
            image,
            vk::Format::R8G8B8A8_SRGB,
            vk::ImageAspectFlags::COLOR,
            mip_levels,
        ) {
            Ok(view) => view,
            Err(e) => {
                destroy_image(&ctx, image, allocation);
                return Err(e);
            }
        };

        let mut texture = Self {
            ctx: ctx.clone(),
            image,
            allocation: Some(allocation),
            view,
            mip_levels,
            width: data.width,
            height: data.height,
        };

        // On upload failure the texture drops here, releasing image/view/memory
        texture.upload(data)?;
        Ok(texture)
    }

    fn upload(&mut self, data: &TextureData) -> Result<()> {
        let staging = Buffer::new(
            self.ctx.clone(),
            data.pixels.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "texture staging",
        )?;
        staging.write(0, &data.pixels)?;

        let image = self.image;
        let mip_levels = self.mip_levels;
        let (width, height) = (self.width, self.height);
        let ctx = self.ctx.clone();

        self.ctx.execute_one_shot(|cmd| {
            record_transition(
                &ctx.device,
                cmd,
                image,
                vk::ImageAspectFlags::COLOR,
                mip_levels,
                ImageLayout::Undefined,
                ImageLayout::TransferDst,
            )?;

            let region = vk::BufferImageCopy {
                buffer_offset: 0,
                buffer_row_length: 0,
                buffer_image_height: 0,
                image_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                image_offset: vk::Offset3D { x: 0, y: 0, z: 0 },
                image_extent: vk::Extent3D {
                    width,
                    height,
                    depth: 1,
                },
            };

            unsafe {
                ctx.device.cmd_copy_buffer_to_image(
                    cmd,
                    staging.buffer,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }

            generate_mipmaps(&ctx.device, cmd, image, width, height, mip_levels);
            Ok(())
        })
    }

    /// Image view covering the full mip chain
    pub fn view(&self) -> vk::ImageView {
        self.view
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}

/// Full mip chain length for the given dimensions
pub(crate) fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

fn create_image(
    ctx: &Arc<GpuContext>,
    extent: vk::Extent2D,
    format: vk::Format,
    usage: vk::ImageUsageFlags,
    mip_levels: u32,
    name: &str,
) -> Result<(vk::Image, Allocation)> {
    unsafe {
        let image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(mip_levels)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = ctx
            .device
            .create_image(&image_create_info, None)
            .map_err(|e| mage_err!("mage::vulkan", "Failed to create image '{}': {:?}", name, e))?;

        let requirements = ctx.device.get_image_memory_requirements(image);

        let allocation = {
            let mut allocator = ctx.allocator.lock().unwrap();
            allocator.allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
        };

        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(e) => {
                ctx.device.destroy_image(image, None);
                return Err(mage_err!("mage::vulkan", "Failed to allocate memory for image '{}': {:?}", name, e));
            }
        };

        if let Err(e) = ctx
            .device
            .bind_image_memory(image, allocation.memory(), allocation.offset())
        {
            ctx.allocator.lock().unwrap().free(allocation).ok();
            ctx.device.destroy_image(image, None);
            return Err(mage_err!("mage::vulkan", "Failed to bind memory for image '{}': {:?}", name, e));
        }

        Ok((image, allocation))
    }
}

fn create_view(
    ctx: &Arc<GpuContext>,
    image: vk::Image,
    format: vk::Format,
    aspect_mask: vk::ImageAspectFlags,
    mip_levels: u32,
) -> Result<vk::ImageView> {
    unsafe {
        let view_create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: mip_levels,
                base_array_layer: 0,
                layer_count: 1,
            });

        ctx.device
            .create_image_view(&view_create_info, None)
            .map_err(|e| mage_err!("mage::vulkan", "Failed to create image view: {:?}", e))
    }
}

fn destroy_image(ctx: &Arc<GpuContext>, image: vk::Image, allocation: Allocation) {
    unsafe {
        if let Ok(mut allocator) = ctx.allocator.lock() {
            allocator.free(allocation).ok();
        }
        ctx.device.destroy_image(image, None);
    }
}

/// Blit the mip chain down level by level, finishing every level in
/// SHADER_READ_ONLY_OPTIMAL. The image must be in TRANSFER_DST_OPTIMAL.
fn generate_mipmaps(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    width: u32,
    height: u32,
    mip_levels: u32,
) {
    let mut mip_width = width as i32;
    let mut mip_height = height as i32;

    for level in 1..mip_levels {
        // Previous level: TRANSFER_DST -> TRANSFER_SRC
        let barrier = vk::ImageMemoryBarrier::default()
            .image(image)
            .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .new_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
            .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
            .dst_access_mask(vk::AccessFlags::TRANSFER_READ)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: level - 1,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe {
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }

        let next_width = (mip_width / 2).max(1);
        let next_height = (mip_height / 2).max(1);

        let blit = vk::ImageBlit {
            src_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level - 1,
                base_array_layer: 0,
                layer_count: 1,
            },
            src_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: mip_width,
                    y: mip_height,
                    z: 1,
                },
            ],
            dst_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: level,
                base_array_layer: 0,
                layer_count: 1,
            },
            dst_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: next_width,
                    y: next_height,
                    z: 1,
                },
            ],
        };

        unsafe {
            device.cmd_blit_image(
                cmd,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[blit],
                vk::Filter::LINEAR,
            );
        }

        // Previous level: TRANSFER_SRC -> SHADER_READ_ONLY
        let barrier = vk::ImageMemoryBarrier::default()
            .image(image)
            .old_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
            .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .src_access_mask(vk::AccessFlags::TRANSFER_READ)
            .dst_access_mask(vk::AccessFlags::SHADER_READ)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: level - 1,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe {
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }

        mip_width = next_width;
        mip_height = next_height;
    }

    // Last level: TRANSFER_DST -> SHADER_READ_ONLY
    let barrier = vk::ImageMemoryBarrier::default()
        .image(image)
        .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .dst_access_mask(vk::AccessFlags::SHADER_READ)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: mip_levels - 1,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(512, 256), 10);
        assert_eq!(mip_level_count(1920, 1080), 11);
    }
}
