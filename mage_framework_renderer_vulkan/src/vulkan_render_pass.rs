/// Render pass creation and framebuffer bundles
///
/// Every pass in the graph uses the standard two-dependency pattern:
///
/// - `EXTERNAL -> 0` transitions from whatever happened before (fragment
///   shader reads of the previous pass's output, or nothing for the first
///   use) into color-attachment output.
/// - `0 -> EXTERNAL` transitions color-attachment output back out to the
///   next consumer (fragment shader reads, or presentation).
///
/// Getting this pairing wrong either stalls the GPU or races the next pass's
/// sampling against this pass's writes.

use ash::vk;
use std::sync::Arc;

use mage_framework::mage::render::{ImageLayout, PassNode};
use mage_framework::mage::{Error, Result};
use mage_framework::mage_err;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::format_to_vk;
use crate::vulkan_transitions::layout_to_vk;

/// One render pass plus its per-image framebuffers.
///
/// Invariant: `framebuffers.len()` equals the swapchain image count, and all
/// framebuffers share the single `render_pass`.
pub(crate) struct RenderPassBundle {
    ctx: Arc<GpuContext>,
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) framebuffers: Vec<vk::Framebuffer>,
    pub(crate) extent: vk::Extent2D,
    /// Color format actually used (swapchain format for presentation passes)
    pub(crate) color_format: vk::Format,
}

impl RenderPassBundle {
    /// Create the render pass and one framebuffer per attachment view set.
    ///
    /// `attachment_views[i]` lists the views for framebuffer `i` in
    /// attachment order (color, then depth if present). Passes targeting a
    /// shared ping-pong attachment pass the same view for every `i`.
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        node: &PassNode,
        color_format: vk::Format,
        extent: vk::Extent2D,
        attachment_views: &[Vec<vk::ImageView>],
    ) -> Result<Self> {
        let render_pass = create_render_pass(&ctx.device, node, color_format)?;

        let mut framebuffers = Vec::with_capacity(attachment_views.len());
        for views in attachment_views {
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(views)
                .width(extent.width)
                .height(extent.height)
                .layers(1);

            let framebuffer = unsafe {
                match ctx.device.create_framebuffer(&framebuffer_info, None) {
                    Ok(framebuffer) => framebuffer,
                    Err(e) => {
                        for &created in &framebuffers {
                            ctx.device.destroy_framebuffer(created, None);
                        }
                        ctx.device.destroy_render_pass(render_pass, None);
                        return Err(mage_err!("mage::vulkan", "Failed to create framebuffer for pass '{}': {:?}", node.name, e));
                    }
                }
            };
            framebuffers.push(framebuffer);
        }

        Ok(Self {
            ctx,
            render_pass,
            framebuffers,
            extent,
            color_format,
        })
    }

    /// Framebuffer for a swapchain image index
    pub(crate) fn framebuffer(&self, image_index: u32) -> Result<vk::Framebuffer> {
        self.framebuffers
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| {
                Error::Backend(format!(
                    "Framebuffer index {} out of range (count: {})",
                    image_index,
                    self.framebuffers.len()
                ))
            })
    }
}

impl Drop for RenderPassBundle {
    fn drop(&mut self) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                self.ctx.device.destroy_framebuffer(framebuffer, None);
            }
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}

/// Create a render pass for a graph node with the two-dependency pattern
fn create_render_pass(
    device: &ash::Device,
    node: &PassNode,
    color_format: vk::Format,
) -> Result<vk::RenderPass> {
    let mut attachments = Vec::with_capacity(2);

    // The color attachment is cleared unless the pass draws over existing
    // content (UI overlay loads the composited frame)
    let color_load_op = if node.initial_layout == ImageLayout::ColorAttachment {
        vk::AttachmentLoadOp::LOAD
    } else {
        vk::AttachmentLoadOp::CLEAR
    };

    attachments.push(
        vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(color_load_op)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(layout_to_vk(node.initial_layout))
            .final_layout(layout_to_vk(node.final_layout)),
    );

    let color_attachment_ref = vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

    let depth_attachment_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    if let Some(depth_format) = node.depth_format {
        attachments.push(
            vk::AttachmentDescription::default()
                .format(format_to_vk(depth_format))
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        );
    }

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(std::slice::from_ref(&color_attachment_ref));

    if node.depth_format.is_some() {
        subpass = subpass.depth_stencil_attachment(&depth_attachment_ref);
    }

    let dependencies = pass_dependencies(node);

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(&dependencies);

    unsafe {
        device
            .create_render_pass(&render_pass_info, None)
            .map_err(|e| mage_err!("mage::vulkan", "Failed to create render pass '{}': {:?}", node.name, e))
    }
}

/// The two subpass dependencies encoding the pass's wait conditions
fn pass_dependencies(node: &PassNode) -> Vec<vk::SubpassDependency> {
    let has_depth = node.depth_format.is_some();

    let (write_stage, write_access) = if has_depth {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
                | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
    } else {
        (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        )
    };

    // EXTERNAL -> 0: what ran before must finish before we write.
    // The previous consumer of this attachment was a fragment shader read
    // (ping-pong reuse); for first-use attachments there is nothing to wait
    // for beyond the implicit acquire, expressed as bottom-of-pipe.
    let entry = if node.initial_layout == ImageLayout::ShaderReadOnly {
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
            .src_access_mask(vk::AccessFlags::SHADER_READ)
            .dst_stage_mask(write_stage)
            .dst_access_mask(write_access)
    } else {
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(write_stage)
            .dst_access_mask(write_access)
    };

    // 0 -> EXTERNAL: our writes must be visible to the next consumer.
    let exit = match node.final_layout {
        ImageLayout::ShaderReadOnly => vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(write_stage)
            .src_access_mask(write_access)
            .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER)
            .dst_access_mask(vk::AccessFlags::SHADER_READ),
        ImageLayout::PresentSrc => vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(write_stage)
            .src_access_mask(write_access)
            .dst_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
            .dst_access_mask(vk::AccessFlags::empty()),
        _ => vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(write_stage)
            .src_access_mask(write_access)
            .dst_stage_mask(write_stage)
            .dst_access_mask(write_access),
    };

    vec![entry, exit]
}
