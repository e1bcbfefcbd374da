/// UI overlay interface
///
/// The UI overlay is an external collaborator: it consumes the composited
/// swapchain image and is the terminal stage of the frame. The scheduler
/// hands it the UI render pass (which loads the composited color and
/// finalizes the image into PRESENT_SRC layout), the semaphore pair linking
/// it into the frame chain, and the fence that closes the frame.

use ash::vk;
use std::sync::Arc;

use mage_framework::mage::Result;
use mage_framework::mage_err;

use crate::vulkan_context::GpuContext;

/// Terminal-stage overlay drawn over the composited frame.
///
/// Implementations own their command buffers and pipelines. The submission
/// must wait on `wait`, signal `signal`, and signal `fence` when all of its
/// GPU work completes; executing `render_pass` performs the final layout
/// transition to PRESENT_SRC.
pub trait UiOverlay {
    /// Advance overlay animations/state
    fn update(&mut self, frame_delta_ms: f32);

    /// Record and submit the overlay draw for `image_index`
    #[allow(clippy::too_many_arguments)]
    fn submit_draw_commands(
        &mut self,
        frame_slot: usize,
        image_index: u32,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        wait: vk::Semaphore,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()>;

    /// Rebuild swapchain-dependent state after a resize
    fn resize(&mut self, extent: vk::Extent2D) -> Result<()>;
}

/// Overlay that draws nothing.
///
/// Still a real pipeline stage: it executes the UI render pass (empty), so
/// the swapchain image reaches PRESENT_SRC layout and the semaphore chain
/// is identical with or without a UI.
pub struct NullUiOverlay {
    ctx: Arc<GpuContext>,
    command_pool: vk::CommandPool,
    /// One command buffer per frame slot
    command_buffers: Vec<vk::CommandBuffer>,
}

impl NullUiOverlay {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(ctx.graphics_queue_family);

            let command_pool = ctx
                .device
                .create_command_pool(&pool_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create UI command pool: {:?}", e))?;

            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(crate::vulkan_sync::MAX_FRAMES_IN_FLIGHT as u32);

            let command_buffers = match ctx.device.allocate_command_buffers(&allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(mage_err!("mage::vulkan", "Failed to allocate UI command buffers: {:?}", e));
                }
            };

            Ok(Self {
                ctx,
                command_pool,
                command_buffers,
            })
        }
    }
}

impl UiOverlay for NullUiOverlay {
    fn update(&mut self, _frame_delta_ms: f32) {}

    fn submit_draw_commands(
        &mut self,
        frame_slot: usize,
        _image_index: u32,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        wait: vk::Semaphore,
        signal: vk::Semaphore,
        fence: vk::Fence,
    ) -> Result<()> {
        unsafe {
            let cmd = self.command_buffers[frame_slot];

            self.ctx
                .device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(|e| mage_err!("mage::vulkan", "Failed to reset UI command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx
                .device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to begin UI command buffer: {:?}", e))?;

            // Empty pass: loads the composited color, transitions to present
            let render_pass_begin = vk::RenderPassBeginInfo::default()
                .render_pass(render_pass)
                .framebuffer(framebuffer)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                });

            self.ctx.device.cmd_begin_render_pass(
                cmd,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );
            self.ctx.device.cmd_end_render_pass(cmd);

            self.ctx
                .device
                .end_command_buffer(cmd)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to end UI command buffer: {:?}", e))?;

            let wait_semaphores = [wait];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let signal_semaphores = [signal];
            let command_buffers = [cmd];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], fence)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to submit UI commands: {:?}", e))
        }
    }

    fn resize(&mut self, _extent: vk::Extent2D) -> Result<()> {
        Ok(())
    }
}

impl Drop for NullUiOverlay {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
