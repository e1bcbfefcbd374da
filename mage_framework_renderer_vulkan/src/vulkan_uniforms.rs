/// Per-frame uniform resources: camera and time/jitter
///
/// One persistently-mapped buffer per frame in flight for each block. A
/// slot's buffer is mutated exactly once per frame, after the in-flight
/// fence wait guarantees the GPU is done reading its previous contents.

use ash::vk;
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use mage_framework::mage::render::MAX_FRAMES_IN_FLIGHT;
use mage_framework::mage::{
    Camera, CameraUniformBlock, Error, JitterSequence, Result, TimeUniformBlock,
};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptors::{DescriptorRegistry, DslKind, PoolSizes};

/// Camera UBOs and descriptor sets, one per frame slot
pub(crate) struct CameraResources {
    buffers: Vec<Buffer>,
    sets: Vec<vk::DescriptorSet>,
}

impl CameraResources {
    /// Pool requirement of the camera sets
    pub(crate) fn pool_requirement() -> PoolSizes {
        PoolSizes {
            uniform_buffers: MAX_FRAMES_IN_FLIGHT as u32,
            combined_image_samplers: 0,
            storage_images: 0,
            sets: MAX_FRAMES_IN_FLIGHT as u32,
        }
    }

    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let buffers = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|i| {
                Buffer::new(
                    ctx.clone(),
                    std::mem::size_of::<CameraUniformBlock>() as u64,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    MemoryLocation::CpuToGpu,
                    &format!("camera ubo {}", i),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            buffers,
            sets: Vec::new(),
        })
    }

    /// Allocate and write the per-frame descriptor sets
    pub(crate) fn create_descriptors(&mut self, registry: &mut DescriptorRegistry) -> Result<()> {
        self.sets = registry.allocate_per_frame_sets(DslKind::Camera)?;
        for (set, buffer) in self.sets.iter().zip(&self.buffers) {
            registry.write_uniform_buffer(
                *set,
                0,
                buffer.handle(),
                std::mem::size_of::<CameraUniformBlock>() as u64,
            );
        }
        Ok(())
    }

    /// Copy the camera block into the slot's mapped buffer
    pub(crate) fn update(&self, frame_slot: usize, camera: &Camera) -> Result<()> {
        self.buffers[frame_slot].write_pod(&camera.uniform_block())
    }

    pub(crate) fn descriptor_set(&self, frame_slot: usize) -> Result<vk::DescriptorSet> {
        self.sets
            .get(frame_slot)
            .copied()
            .ok_or_else(|| Error::Configuration("Camera descriptor sets not created".to_string()))
    }
}

/// Time/jitter UBOs and descriptor sets, one per frame slot
pub(crate) struct TimeResources {
    buffers: Vec<Buffer>,
    sets: Vec<vk::DescriptorSet>,
    jitter: JitterSequence,
}

impl TimeResources {
    /// Pool requirement of the time sets
    pub(crate) fn pool_requirement() -> PoolSizes {
        PoolSizes {
            uniform_buffers: MAX_FRAMES_IN_FLIGHT as u32,
            combined_image_samplers: 0,
            storage_images: 0,
            sets: MAX_FRAMES_IN_FLIGHT as u32,
        }
    }

    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let buffers = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|i| {
                Buffer::new(
                    ctx.clone(),
                    std::mem::size_of::<TimeUniformBlock>() as u64,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    MemoryLocation::CpuToGpu,
                    &format!("time ubo {}", i),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            buffers,
            sets: Vec::new(),
            jitter: JitterSequence::txaa(),
        })
    }

    /// Allocate and write the per-frame descriptor sets
    pub(crate) fn create_descriptors(&mut self, registry: &mut DescriptorRegistry) -> Result<()> {
        self.sets = registry.allocate_per_frame_sets(DslKind::Time)?;
        for (set, buffer) in self.sets.iter().zip(&self.buffers) {
            registry.write_uniform_buffer(
                *set,
                0,
                buffer.handle(),
                std::mem::size_of::<TimeUniformBlock>() as u64,
            );
        }
        Ok(())
    }

    /// Write the slot's time block with the frame's jitter sample
    pub(crate) fn update(
        &self,
        frame_slot: usize,
        frame_counter: u64,
        elapsed_secs: f32,
        frame_delta_ms: f32,
    ) -> Result<()> {
        let block = TimeUniformBlock {
            elapsed_secs,
            frame_delta_ms,
            jitter: self.jitter.at(frame_counter),
        };
        self.buffers[frame_slot].write_pod(&block)
    }

    pub(crate) fn descriptor_set(&self, frame_slot: usize) -> Result<vk::DescriptorSet> {
        self.sets
            .get(frame_slot)
            .copied()
            .ok_or_else(|| Error::Configuration("Time descriptor sets not created".to_string()))
    }
}
