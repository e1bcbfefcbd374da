/// Buffer - RAII Vulkan buffer with gpu-allocator backing

use ash::vk;
use bytemuck::Pod;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use mage_framework::mage::{Error, Result};
use mage_framework::mage_err;

use crate::vulkan_context::GpuContext;

/// Owning Vulkan buffer.
///
/// Buffer and allocation are created and destroyed together; a failure
/// between the two steps releases the partially-created handle instead of
/// leaking it.
pub struct Buffer {
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    allocation: Option<Allocation>,
}

impl Buffer {
    /// Create a buffer and bind fresh memory to it.
    ///
    /// `CpuToGpu` buffers are persistently mapped and writable through
    /// [`Buffer::write`]; `GpuOnly` buffers are filled via staging upload.
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
    ) -> Result<Self> {
        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx
                .device
                .create_buffer(&buffer_create_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create buffer '{}': {:?}", name, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);

            let allocation = {
                let mut allocator = ctx.allocator.lock().unwrap();
                allocator.allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
            };

            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(mage_err!("mage::vulkan", "Failed to allocate memory for buffer '{}': {:?}", name, e));
                }
            };

            if let Err(e) = ctx
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                ctx.allocator.lock().unwrap().free(allocation).ok();
                ctx.device.destroy_buffer(buffer, None);
                return Err(mage_err!("mage::vulkan", "Failed to bind memory for buffer '{}': {:?}", name, e));
            }

            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
            })
        }
    }

    /// Create a GPU-only buffer and fill it through a staging buffer
    pub(crate) fn new_device_local_with_data(
        ctx: Arc<GpuContext>,
        data: &[u8],
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> Result<Self> {
        let staging = Buffer::new(
            ctx.clone(),
            data.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
            "staging",
        )?;
        staging.write(0, data)?;

        let buffer = Buffer::new(
            ctx.clone(),
            data.len() as u64,
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
            name,
        )?;

        ctx.execute_one_shot(|cmd| {
            let region = vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size: data.len() as u64,
            };
            unsafe {
                ctx.device
                    .cmd_copy_buffer(cmd, staging.buffer, buffer.buffer, &[region]);
            }
            Ok(())
        })?;

        Ok(buffer)
    }

    /// Write bytes into the persistently-mapped allocation
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| Error::Backend("Buffer has no allocation".to_string()))?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| Error::Backend("Buffer is not CPU-accessible".to_string()))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped_ptr.offset(offset as isize),
                data.len(),
            );
        }

        Ok(())
    }

    /// Write one Pod value at offset 0
    pub fn write_pod<T: Pod>(&self, value: &T) -> Result<()> {
        self.write(0, bytemuck::bytes_of(value))
    }

    /// Buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
