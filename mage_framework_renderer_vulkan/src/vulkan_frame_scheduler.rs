/// FrameScheduler - the per-frame submission state machine
///
/// Strictly sequential on the CPU submission thread, overlapped on the GPU
/// through the semaphore chain declared by `SubmissionPlan::standard()`:
///
/// 1. wait + reset the slot's in-flight fence
/// 2. update uniforms (camera, per-model, time/jitter)
/// 3. acquire a swapchain image (failure → full rebuild)
/// 4. submit compute        → signals compute-finished
/// 5. submit graphics       → waits compute,  signals forward-finished
/// 6. submit post-process   → waits forward + image-available, signals post-finished
/// 7. submit UI overlay     → waits post, signals render-finished + fence
/// 8. present               → waits render-finished (failure → full rebuild)
/// 9. advance the frame index
///
/// Command buffers are pre-recorded once per frame slot and re-recorded only
/// on resize or when acquire hands the slot a different image index than it
/// was recorded against.

use ash::vk;
use std::sync::Arc;

use mage_framework::mage::render::{PassKind, PassSource};
use mage_framework::mage::{Camera, Error, Result};
use mage_framework::{mage_err, mage_info};

use crate::vulkan_context::GpuContext;
use crate::vulkan_backend::VulkanBackend;

/// Pre-recorded command buffers of one frame slot
pub(crate) struct SlotCommands {
    ctx: Arc<GpuContext>,
    graphics_pool: vk::CommandPool,
    compute_pool: vk::CommandPool,
    /// Compute dispatch commands (compute queue)
    pub(crate) compute: vk::CommandBuffer,
    /// Geometry raster commands
    pub(crate) graphics: vk::CommandBuffer,
    /// Post-process chain commands (composite → posts → tonemap → present)
    pub(crate) post: vk::CommandBuffer,
    /// Swapchain image index the buffers were recorded against
    pub(crate) recorded_for_image: Option<u32>,
}

impl SlotCommands {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let graphics_pool_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(ctx.graphics_queue_family);
            let graphics_pool = ctx
                .device
                .create_command_pool(&graphics_pool_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create slot command pool: {:?}", e))?;

            let compute_pool_info = vk::CommandPoolCreateInfo::default()
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
                .queue_family_index(ctx.compute_queue_family);
            let compute_pool = match ctx.device.create_command_pool(&compute_pool_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    ctx.device.destroy_command_pool(graphics_pool, None);
                    return Err(mage_err!("mage::vulkan", "Failed to create compute command pool: {:?}", e));
                }
            };

            let allocate = |pool: vk::CommandPool, count: u32| -> Result<Vec<vk::CommandBuffer>> {
                let info = vk::CommandBufferAllocateInfo::default()
                    .command_pool(pool)
                    .level(vk::CommandBufferLevel::PRIMARY)
                    .command_buffer_count(count);
                ctx.device
                    .allocate_command_buffers(&info)
                    .map_err(|e| mage_err!("mage::vulkan", "Failed to allocate slot command buffers: {:?}", e))
            };

            let buffers = allocate(graphics_pool, 2).and_then(|graphics_buffers| {
                allocate(compute_pool, 1).map(|compute_buffers| (graphics_buffers, compute_buffers))
            });
            let (graphics_buffers, compute_buffers) = match buffers {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(graphics_pool, None);
                    ctx.device.destroy_command_pool(compute_pool, None);
                    return Err(e);
                }
            };

            Ok(Self {
                ctx,
                graphics_pool,
                compute_pool,
                compute: compute_buffers[0],
                graphics: graphics_buffers[0],
                post: graphics_buffers[1],
                recorded_for_image: None,
            })
        }
    }
}

impl Drop for SlotCommands {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_command_pool(self.graphics_pool, None);
            self.ctx.device.destroy_command_pool(self.compute_pool, None);
        }
    }
}

impl VulkanBackend {
    /// Drive one complete frame.
    ///
    /// Recoverable presentation errors (out-of-date surface) trigger the
    /// full rebuild path and return `Ok`; the frame is silently re-rendered
    /// after reconstruction. Everything else is fatal and propagates.
    pub fn render_frame(
        &mut self,
        camera: &Camera,
        frame_counter: u64,
        elapsed_secs: f32,
        frame_delta_ms: f32,
    ) -> Result<()> {
        // Minimized windows render nothing; recreation waits for a
        // non-zero extent
        if self.pending_extent.0 == 0 || self.pending_extent.1 == 0 {
            return Ok(());
        }
        if self.pass_graph.is_none() {
            return Err(Error::Configuration(
                "render_frame called before initialize()".to_string(),
            ));
        }

        let slot = self.sync.current_frame();

        // 1. WaitFence: the GPU is done with this slot's buffers and sets
        self.sync.wait_and_reset_in_flight_fence()?;

        // 2. UpdateUniforms: plain writes into the slot's mapped buffers
        self.camera_resources.as_ref().unwrap().update(slot, camera)?;
        self.scene.as_ref().unwrap().update_uniforms(slot, elapsed_secs)?;
        self.time_resources.as_ref().unwrap().update(
            slot,
            frame_counter,
            elapsed_secs,
            frame_delta_ms,
        )?;
        if let Some(ui) = self.ui.as_mut() {
            ui.update(frame_delta_ms);
        }

        // 3. AcquireImage
        let image_index = match self
            .swapchain
            .acquire_next_image(self.sync.image_available_semaphore())
        {
            Ok(index) => index,
            Err(Error::SurfaceOutOfDate) => {
                // Nothing was submitted: re-signal the fence we just reset,
                // rebuild, and let the caller retry the frame
                self.resignal_in_flight_fence()?;
                self.rebuild_swapchain_resources()?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // The slot's commands reference framebuffers by image index;
        // re-record if acquire handed us a different image than recorded
        if self.slots[slot].recorded_for_image != Some(image_index) {
            self.record_slot(slot, image_index)?;
        }

        // 4-6. Compute, graphics, post-process submissions
        self.submit_frame_commands(slot)?;

        // 7. UI overlay: terminal stage, signals render-finished + fence
        let ui_node_index = self.frame_graph.nodes().len() - 1;
        let (ui_pass, ui_framebuffer, ui_extent) = {
            let bundle = self.pass_graph.as_ref().unwrap().bundle(ui_node_index);
            (
                bundle.render_pass,
                bundle.framebuffer(image_index)?,
                bundle.extent,
            )
        };
        let wait = self.sync.post_process_finished_semaphore();
        let signal = self.sync.render_finished_semaphore();
        let fence = self.sync.in_flight_fence();
        self.ui
            .as_mut()
            .ok_or_else(|| Error::Configuration("No UI overlay installed".to_string()))?
            .submit_draw_commands(
                slot,
                image_index,
                ui_pass,
                ui_framebuffer,
                ui_extent,
                wait,
                signal,
                fence,
            )?;

        // 8. Present
        match self
            .swapchain
            .present(image_index, self.sync.render_finished_semaphore())
        {
            Ok(()) => {}
            Err(Error::SurfaceOutOfDate) => {
                self.rebuild_swapchain_resources()?;
            }
            Err(e) => return Err(e),
        }

        // 9. AdvanceFrameIndex: exactly once per completed frame
        self.sync.advance();
        self.stats.frames_rendered += 1;
        Ok(())
    }

    /// Steps 4-6: the three queue submissions of the frame chain
    fn submit_frame_commands(&self, slot: usize) -> Result<()> {
        let device = &self.ctx.device;
        let slot_cmds = &self.slots[slot];

        unsafe {
            // 4. Compute → signals compute-finished
            let command_buffers = [slot_cmds.compute];
            let signal_semaphores = [self.sync.compute_finished_semaphore()];
            let submit_info = vk::SubmitInfo::default()
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);
            device
                .queue_submit(self.ctx.compute_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| mage_err!("mage::vulkan", "Failed to submit compute commands: {:?}", e))?;

            // 5. Graphics → waits compute output, signals forward-finished
            let wait_semaphores = [self.sync.compute_finished_semaphore()];
            let wait_stages = [vk::PipelineStageFlags::FRAGMENT_SHADER];
            let command_buffers = [slot_cmds.graphics];
            let signal_semaphores = [self.sync.forward_render_finished_semaphore()];
            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);
            device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| mage_err!("mage::vulkan", "Failed to submit graphics commands: {:?}", e))?;

            // 6. Post-process chain → first writer of the swapchain image,
            // so it also waits on acquire
            let wait_semaphores = [
                self.sync.forward_render_finished_semaphore(),
                self.sync.image_available_semaphore(),
            ];
            let wait_stages = [
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            ];
            let command_buffers = [slot_cmds.post];
            let signal_semaphores = [self.sync.post_process_finished_semaphore()];
            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);
            device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| mage_err!("mage::vulkan", "Failed to submit post-process commands: {:?}", e))?;
        }

        Ok(())
    }

    /// Re-signal the slot's fence after a frame aborted between fence reset
    /// and submission (acquire failure): an empty submission signals it once
    /// prior queue work drains.
    fn resignal_in_flight_fence(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .queue_submit(self.ctx.graphics_queue, &[], self.sync.in_flight_fence())
                .map_err(|e| mage_err!("mage::vulkan", "Failed to re-signal in-flight fence: {:?}", e))
        }
    }

    /// The only recovery path: device-idle wait → destroy every
    /// resolution-dependent resource → recreate the swapchain → rebuild the
    /// pass graph, descriptors, and pipelines in startup order → re-record
    /// all command buffers.
    ///
    /// Returns `Ok(false)` while the window is minimized (zero extent);
    /// the caller keeps waiting for window events.
    pub fn rebuild_swapchain_resources(&mut self) -> Result<bool> {
        let (width, height) = self.pending_extent;
        if width == 0 || height == 0 {
            return Ok(false);
        }

        self.wait_idle()?;

        // Destroy the resolution-dependent tail before the swapchain swap
        self.pipelines.clear();
        self.compute_pipeline = None;
        self.stage_sets.clear();
        self.composite_sets.clear();
        self.compute_sets.clear();
        self.registry = None;
        self.pass_graph = None;

        self.swapchain.recreate(width, height)?;
        self.build_frame_resources()?;

        let extent = self.swapchain.extent();
        if let Some(ui) = self.ui.as_mut() {
            ui.resize(extent)?;
        }

        self.stats.swapchain_rebuilds += 1;
        mage_info!(
            "mage::FrameScheduler",
            "Swapchain resources rebuilt ({}x{})",
            extent.width,
            extent.height
        );
        Ok(true)
    }

    // ===== COMMAND RECORDING =====

    /// Record all three command buffers of a slot against an image index
    pub(crate) fn record_slot(&mut self, slot: usize, image_index: u32) -> Result<()> {
        self.record_compute_commands(slot)?;
        self.record_graphics_commands(slot, image_index)?;
        self.record_post_commands(slot, image_index)?;
        self.slots[slot].recorded_for_image = Some(image_index);

        let model_draws = self.scene.as_ref().map(|s| s.model_count()).unwrap_or(0) as u32;
        let fullscreen_draws = self.frame_graph.nodes().len() as u32 - 2;
        self.stats.draw_calls_per_frame = model_draws + fullscreen_draws;
        Ok(())
    }

    /// Compute dispatch: procedural sky into the slot's storage image
    fn record_compute_commands(&self, slot: usize) -> Result<()> {
        let device = &self.ctx.device;
        let cmd = self.slots[slot].compute;
        let pass_graph = self.pass_graph.as_ref().unwrap();
        let pipeline = self.compute_pipeline.as_ref().unwrap();
        let extent = pass_graph.full_extent();

        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(|e| mage_err!("mage::vulkan", "Failed to reset compute command buffer: {:?}", e))?;
            let begin_info = vk::CommandBufferBeginInfo::default();
            device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to begin compute command buffer: {:?}", e))?;

            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::COMPUTE, pipeline.pipeline);

            let sets = [
                self.compute_sets[slot],
                self.time_resources.as_ref().unwrap().descriptor_set(slot)?,
            ];
            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::COMPUTE,
                pipeline.layout,
                0,
                &sets,
                &[],
            );

            device.cmd_dispatch(
                cmd,
                (extent.width + 15) / 16,
                (extent.height + 15) / 16,
                1,
            );

            device
                .end_command_buffer(cmd)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to end compute command buffer: {:?}", e))?;
        }
        Ok(())
    }

    /// Geometry raster pass into the per-image HDR color + depth targets
    fn record_graphics_commands(&self, slot: usize, image_index: u32) -> Result<()> {
        let device = &self.ctx.device;
        let cmd = self.slots[slot].graphics;
        let pass_graph = self.pass_graph.as_ref().unwrap();
        let scene = self.scene.as_ref().unwrap();
        let camera_set = self.camera_resources.as_ref().unwrap().descriptor_set(slot)?;
        let time_set = self.time_resources.as_ref().unwrap().descriptor_set(slot)?;

        let bundle = pass_graph.bundle(0);
        let pipeline = self.pipelines[0]
            .as_ref()
            .ok_or_else(|| Error::Configuration("Geometry pipeline missing".to_string()))?;

        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(|e| mage_err!("mage::vulkan", "Failed to reset graphics command buffer: {:?}", e))?;
            let begin_info = vk::CommandBufferBeginInfo::default();
            device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to begin graphics command buffer: {:?}", e))?;

            let clear_values = [
                vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: [0.0, 0.0, 0.0, 1.0],
                    },
                },
                vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: 1.0,
                        stencil: 0,
                    },
                },
            ];

            let render_pass_begin = vk::RenderPassBeginInfo::default()
                .render_pass(bundle.render_pass)
                .framebuffer(bundle.framebuffer(image_index)?)
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: bundle.extent,
                })
                .clear_values(&clear_values);

            device.cmd_begin_render_pass(cmd, &render_pass_begin, vk::SubpassContents::INLINE);
            set_viewport_scissor(device, cmd, bundle.extent);
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);

            for (name, model) in scene.models_in_order() {
                let model_set = scene.require_descriptor_set(slot, name)?;
                let sets = [camera_set, model_set, time_set];
                device.cmd_bind_descriptor_sets(
                    cmd,
                    vk::PipelineBindPoint::GRAPHICS,
                    pipeline.layout,
                    0,
                    &sets,
                    &[],
                );
                device.cmd_bind_vertex_buffers(cmd, 0, &[model.vertex_buffer.handle()], &[0]);
                device.cmd_bind_index_buffer(
                    cmd,
                    model.index_buffer.handle(),
                    0,
                    vk::IndexType::UINT32,
                );
                device.cmd_draw_indexed(cmd, model.index_count, 1, 0, 0, 0);
            }

            device.cmd_end_render_pass(cmd);
            device
                .end_command_buffer(cmd)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to end graphics command buffer: {:?}", e))?;
        }
        Ok(())
    }

    /// The post-process chain: compute composite, high-res stages, tonemap,
    /// low-res stages, final composite, in the fixed graph order, each pass
    /// reading what the previous one wrote
    fn record_post_commands(&self, slot: usize, image_index: u32) -> Result<()> {
        let device = &self.ctx.device;
        let cmd = self.slots[slot].post;
        let pass_graph = self.pass_graph.as_ref().unwrap();
        let time_set = self.time_resources.as_ref().unwrap().descriptor_set(slot)?;
        let schedule = pass_graph.schedule();

        unsafe {
            device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(|e| mage_err!("mage::vulkan", "Failed to reset post command buffer: {:?}", e))?;
            let begin_info = vk::CommandBufferBeginInfo::default();
            device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to begin post command buffer: {:?}", e))?;

            for (node_index, node) in self.frame_graph.nodes().iter().enumerate() {
                if matches!(node.kind, PassKind::Geometry | PassKind::UiOverlay) {
                    continue;
                }

                let bundle = pass_graph.bundle(node_index);
                let pipeline = self.pipelines[node_index].as_ref().ok_or_else(|| {
                    Error::Configuration(format!("Pipeline for pass '{}' missing", node.name))
                })?;

                let clear_values = [vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: [0.0, 0.0, 0.0, 1.0],
                    },
                }];

                let render_pass_begin = vk::RenderPassBeginInfo::default()
                    .render_pass(bundle.render_pass)
                    .framebuffer(bundle.framebuffer(image_index)?)
                    .render_area(vk::Rect2D {
                        offset: vk::Offset2D { x: 0, y: 0 },
                        extent: bundle.extent,
                    })
                    .clear_values(&clear_values);

                device.cmd_begin_render_pass(cmd, &render_pass_begin, vk::SubpassContents::INLINE);
                set_viewport_scissor(device, cmd, bundle.extent);
                device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);

                // Binding order must exactly match the pipeline layout's
                // descriptor-set-layout list
                match node.kind {
                    PassKind::ComputeComposite => {
                        debug_assert_eq!(schedule[node_index].source, PassSource::GeometryColor);
                        let sets = [
                            self.composite_sets[image_index as usize],
                            self.compute_sets[slot],
                            time_set,
                        ];
                        device.cmd_bind_descriptor_sets(
                            cmd,
                            vk::PipelineBindPoint::GRAPHICS,
                            pipeline.layout,
                            0,
                            &sets,
                            &[],
                        );
                    }
                    _ => {
                        let stage_set = self.stage_sets[node_index].ok_or_else(|| {
                            Error::Configuration(format!(
                                "Descriptor set for pass '{}' missing",
                                node.name
                            ))
                        })?;
                        let sets = [stage_set, time_set];
                        device.cmd_bind_descriptor_sets(
                            cmd,
                            vk::PipelineBindPoint::GRAPHICS,
                            pipeline.layout,
                            0,
                            &sets,
                            &[],
                        );
                    }
                }

                // Fullscreen triangle, no vertex buffer
                device.cmd_draw(cmd, 3, 1, 0, 0);
                device.cmd_end_render_pass(cmd);
            }

            device
                .end_command_buffer(cmd)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to end post command buffer: {:?}", e))?;
        }
        Ok(())
    }
}

fn set_viewport_scissor(device: &ash::Device, cmd: vk::CommandBuffer, extent: vk::Extent2D) {
    let viewport = vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    };
    let scissor = vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    };
    unsafe {
        device.cmd_set_viewport(cmd, 0, &[viewport]);
        device.cmd_set_scissor(cmd, 0, &[scissor]);
    }
}
