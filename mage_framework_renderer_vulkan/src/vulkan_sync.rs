/// Per-frame synchronization primitives
///
/// One full set of semaphores and one fence per frame in flight. The five
/// semaphores of a slot form the linear chain declared by
/// `SubmissionPlan::standard()`: acquire → compute → graphics → post-process
/// → UI → present. Every array here has exactly `MAX_FRAMES_IN_FLIGHT`
/// entries, decoupled from the swapchain image count.

use ash::vk;
use std::sync::Arc;

use mage_framework::mage::Result;
use mage_framework::mage_err;

use crate::vulkan_context::GpuContext;

pub use mage_framework::mage::render::MAX_FRAMES_IN_FLIGHT;

/// Synchronization objects for all frame slots
pub(crate) struct FrameSync {
    ctx: Arc<GpuContext>,

    /// Signaled by acquire when the swapchain image is ready
    image_available: Vec<vk::Semaphore>,
    /// Signaled by the compute submission
    compute_finished: Vec<vk::Semaphore>,
    /// Signaled by the forward raster submission
    forward_render_finished: Vec<vk::Semaphore>,
    /// Signaled by the post-process submission
    post_process_finished: Vec<vk::Semaphore>,
    /// Signaled by the UI submission; present waits on it
    render_finished: Vec<vk::Semaphore>,
    /// Signaled when all GPU work for the slot has completed
    in_flight: Vec<vk::Fence>,

    /// Current frame slot, advanced exactly once per presented frame
    current_frame: usize,
}

impl FrameSync {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let semaphore_info = vk::SemaphoreCreateInfo::default();
            // Fences start signaled so the first wait on each slot passes
            let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

            let mut make_semaphores = || -> Result<Vec<vk::Semaphore>> {
                (0..MAX_FRAMES_IN_FLIGHT)
                    .map(|_| {
                        ctx.device
                            .create_semaphore(&semaphore_info, None)
                            .map_err(|e| mage_err!("mage::vulkan", "Failed to create semaphore: {:?}", e))
                    })
                    .collect()
            };

            let image_available = make_semaphores()?;
            let compute_finished = make_semaphores()?;
            let forward_render_finished = make_semaphores()?;
            let post_process_finished = make_semaphores()?;
            let render_finished = make_semaphores()?;

            let in_flight = (0..MAX_FRAMES_IN_FLIGHT)
                .map(|_| {
                    ctx.device
                        .create_fence(&fence_info, None)
                        .map_err(|e| mage_err!("mage::vulkan", "Failed to create in-flight fence: {:?}", e))
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Self {
                ctx,
                image_available,
                compute_finished,
                forward_render_finished,
                post_process_finished,
                render_finished,
                in_flight,
                current_frame: 0,
            })
        }
    }

    /// Current frame slot index
    pub(crate) fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Block until the GPU has finished the work submitted for this slot
    /// `MAX_FRAMES_IN_FLIGHT` frames ago, then reset the fence.
    ///
    /// Must be called before any uniform-buffer mutation or command-buffer
    /// re-recording for the slot. The timeout is unbounded by design: a hung
    /// GPU hangs the application.
    pub(crate) fn wait_and_reset_in_flight_fence(&self) -> Result<()> {
        unsafe {
            let fence = [self.in_flight[self.current_frame]];
            self.ctx
                .device
                .wait_for_fences(&fence, true, u64::MAX)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to wait for in-flight fence: {:?}", e))?;
            self.ctx
                .device
                .reset_fences(&fence)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to reset in-flight fence: {:?}", e))
        }
    }

    /// Advance to the next frame slot; called exactly once per completed
    /// frame, after present.
    pub(crate) fn advance(&mut self) {
        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
    }

    // ===== PER-SLOT ACCESSORS =====

    pub(crate) fn image_available_semaphore(&self) -> vk::Semaphore {
        self.image_available[self.current_frame]
    }

    pub(crate) fn compute_finished_semaphore(&self) -> vk::Semaphore {
        self.compute_finished[self.current_frame]
    }

    pub(crate) fn forward_render_finished_semaphore(&self) -> vk::Semaphore {
        self.forward_render_finished[self.current_frame]
    }

    pub(crate) fn post_process_finished_semaphore(&self) -> vk::Semaphore {
        self.post_process_finished[self.current_frame]
    }

    pub(crate) fn render_finished_semaphore(&self) -> vk::Semaphore {
        self.render_finished[self.current_frame]
    }

    pub(crate) fn in_flight_fence(&self) -> vk::Fence {
        self.in_flight[self.current_frame]
    }

    /// Lengths of every sync array, for the frame-count invariant
    pub(crate) fn object_counts(&self) -> [usize; 6] {
        [
            self.image_available.len(),
            self.compute_finished.len(),
            self.forward_render_finished.len(),
            self.post_process_finished.len(),
            self.render_finished.len(),
            self.in_flight.len(),
        ]
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            for &semaphore in self
                .image_available
                .iter()
                .chain(&self.compute_finished)
                .chain(&self.forward_render_finished)
                .chain(&self.post_process_finished)
                .chain(&self.render_finished)
            {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
            for &fence in &self.in_flight {
                self.ctx.device.destroy_fence(fence, None);
            }
        }
    }
}
