/// GpuContext - Shared GPU resources for all Vulkan objects
///
/// Contains everything needed for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queues for command submission
/// - Command pool for one-shot upload operations

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::Mutex;

use mage_framework::mage::Result;
use mage_framework::mage_err;

/// Shared GPU context for all Vulkan resources.
///
/// This struct is shared (via `Arc`) by all GPU resources (textures, buffers,
/// render passes, pipelines) to avoid duplicating device/allocator/queue
/// references in each resource. Because every resource holds an `Arc`, the
/// context is dropped last, which makes its `Drop` the single place where the
/// device and instance are destroyed, after every resource has released its
/// handles.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    /// Wrapped in ManuallyDrop so it can be freed BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue for raster/post/UI command submission
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,

    /// Compute queue (may alias the graphics queue when no dedicated
    /// compute-capable family exists)
    pub compute_queue: vk::Queue,
    pub compute_queue_family: u32,

    /// Present queue (may alias the graphics queue)
    pub present_queue: vk::Queue,
    #[allow(dead_code)]
    pub present_queue_family: u32,

    /// Reusable command pool for one-shot upload operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub upload_command_pool: Mutex<vk::CommandPool>,

    /// Vulkan instance (destroyed here, after the device)
    pub(crate) instance: ash::Instance,

    /// Vulkan entry; must outlive the instance (dropped after `drop()` runs)
    pub(crate) _entry: ash::Entry,

    /// Debug utils loader (for validation layers)
    #[cfg(feature = "vulkan-validation")]
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle
    #[cfg(feature = "vulkan-validation")]
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl GpuContext {
    /// Record and submit a one-shot command buffer on the graphics queue,
    /// then block until it completes.
    ///
    /// Used for staging uploads, mip generation and initial layout
    /// transitions, never on the per-frame path.
    pub(crate) fn execute_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer) -> Result<()>,
    {
        unsafe {
            let pool = *self.upload_command_pool.lock().unwrap();

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self
                .device
                .allocate_command_buffers(&allocate_info)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to allocate one-shot command buffer: {:?}", e))?[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to begin one-shot command buffer: {:?}", e))?;

            let record_result = record(command_buffer);

            if let Err(e) = record_result {
                self.device.free_command_buffers(pool, &[command_buffer]);
                return Err(e);
            }

            self.device
                .end_command_buffer(command_buffer)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to end one-shot command buffer: {:?}", e))?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);

            let fence_info = vk::FenceCreateInfo::default();
            let fence = self
                .device
                .create_fence(&fence_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create one-shot fence: {:?}", e))?;

            let submit_result = self
                .device
                .queue_submit(self.graphics_queue, &[submit_info], fence)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to submit one-shot commands: {:?}", e));

            let wait_result = submit_result.and_then(|_| {
                self.device
                    .wait_for_fences(&[fence], true, u64::MAX)
                    .map_err(|e| mage_err!("mage::vulkan", "Failed to wait for one-shot commands: {:?}", e))
            });

            self.device.destroy_fence(fence, None);
            self.device.free_command_buffers(pool, &[command_buffer]);

            wait_result
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            // All resources holding an Arc<GpuContext> are gone by now;
            // destruction order is the reverse of creation.
            ManuallyDrop::drop(&mut self.allocator);

            let pool = *self.upload_command_pool.lock().unwrap();
            self.device.destroy_command_pool(pool, None);

            self.device.destroy_device(None);

            #[cfg(feature = "vulkan-validation")]
            if let (Some(loader), Some(messenger)) =
                (&self.debug_utils_loader, self.debug_messenger)
            {
                loader.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}
