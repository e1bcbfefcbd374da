/// PassGraph - realizes the frame-graph description against the GPU
///
/// Owns every resolution-dependent object of the pass sequence: the
/// geometry targets (per swapchain image), the double-buffered high/low
/// resolution post-process targets, the tonemap target, the per-frame-slot
/// compute storage images, and one `RenderPassBundle` per graph node. All
/// of it is destroyed and recreated wholesale on resize, in the same
/// dependency order as startup.

use ash::vk;
use std::sync::Arc;

use mage_framework::mage::render::{
    FrameGraph, ImageLayout, PassIo, PassKind, PassResolution, PassSource, PassTarget,
    MAX_FRAMES_IN_FLIGHT,
};
use mage_framework::mage::{Error, Result};
use mage_framework::mage_debug;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::format_to_vk;
use crate::vulkan_render_pass::RenderPassBundle;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::FrameBufferAttachment;
use crate::vulkan_transitions::record_transition;

/// Storage image format written by the compute pass
const COMPUTE_IMAGE_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;

pub(crate) struct PassGraph {
    graph: FrameGraph,
    schedule: Vec<PassIo>,

    full_extent: vk::Extent2D,

    // Attachments, owned exclusively by this graph
    geometry_color: Vec<FrameBufferAttachment>,
    geometry_depth: Vec<FrameBufferAttachment>,
    high_res: Vec<FrameBufferAttachment>,
    tonemap_target: FrameBufferAttachment,
    low_res: Vec<FrameBufferAttachment>,
    compute_images: Vec<FrameBufferAttachment>,

    /// One bundle per graph node, in execution order
    bundles: Vec<RenderPassBundle>,
}

impl PassGraph {
    /// Create every attachment and render pass of the graph.
    ///
    /// `graph` must already be validated; realization still re-checks the
    /// framebuffer-count invariant afterwards.
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        graph: &FrameGraph,
        swapchain: &Swapchain,
    ) -> Result<Self> {
        let full_extent = swapchain.extent();
        let low_extent = vk::Extent2D {
            width: (full_extent.width / 2).max(1),
            height: (full_extent.height / 2).max(1),
        };
        let image_count = swapchain.image_count();

        // ===== ATTACHMENTS (dependency order) =====

        let hdr_format = format_to_vk(
            graph
                .node("geometry")
                .and_then(|n| n.color_format)
                .ok_or_else(|| Error::Configuration("Frame graph has no geometry pass".to_string()))?,
        );
        let ldr_format = format_to_vk(
            graph
                .node("tonemap")
                .and_then(|n| n.color_format)
                .ok_or_else(|| Error::Configuration("Frame graph has no tonemap pass".to_string()))?,
        );

        let mut geometry_color = Vec::with_capacity(image_count);
        let mut geometry_depth = Vec::with_capacity(image_count);
        for i in 0..image_count {
            geometry_color.push(FrameBufferAttachment::new(
                ctx.clone(),
                full_extent,
                hdr_format,
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
                vk::ImageAspectFlags::COLOR,
                &format!("geometry color {}", i),
            )?);
            geometry_depth.push(FrameBufferAttachment::new(
                ctx.clone(),
                full_extent,
                vk::Format::D32_SFLOAT,
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                vk::ImageAspectFlags::DEPTH,
                &format!("geometry depth {}", i),
            )?);
        }

        let high_res = (0..2)
            .map(|i| {
                FrameBufferAttachment::new(
                    ctx.clone(),
                    full_extent,
                    hdr_format,
                    vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
                    vk::ImageAspectFlags::COLOR,
                    &format!("high-res ping-pong {}", i),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let tonemap_target = FrameBufferAttachment::new(
            ctx.clone(),
            full_extent,
            ldr_format,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
            vk::ImageAspectFlags::COLOR,
            "tonemap target",
        )?;

        let has_low_stages = graph
            .nodes()
            .iter()
            .any(|n| n.kind == PassKind::PostProcess && n.resolution == PassResolution::Low);
        let low_res = if has_low_stages {
            (0..2)
                .map(|i| {
                    FrameBufferAttachment::new(
                        ctx.clone(),
                        low_extent,
                        ldr_format,
                        vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
                        vk::ImageAspectFlags::COLOR,
                        &format!("low-res ping-pong {}", i),
                    )
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        // Compute storage images, one per frame slot, kept in GENERAL layout
        let compute_images = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|i| {
                FrameBufferAttachment::new(
                    ctx.clone(),
                    full_extent,
                    COMPUTE_IMAGE_FORMAT,
                    vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::SAMPLED,
                    vk::ImageAspectFlags::COLOR,
                    &format!("compute image {}", i),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        ctx.execute_one_shot(|cmd| {
            for image in &compute_images {
                record_transition(
                    &ctx.device,
                    cmd,
                    image.image,
                    vk::ImageAspectFlags::COLOR,
                    1,
                    ImageLayout::Undefined,
                    ImageLayout::General,
                )?;
            }
            Ok(())
        })?;

        // ===== RENDER PASSES + FRAMEBUFFERS (execution order) =====

        let schedule = graph.schedule();
        let mut bundles = Vec::with_capacity(graph.nodes().len());

        for (node, io) in graph.nodes().iter().zip(&schedule) {
            let (color_format, extent) = match io.target {
                PassTarget::GeometryColor | PassTarget::HighRes(_) => (hdr_format, full_extent),
                PassTarget::TonemapOutput => (ldr_format, full_extent),
                PassTarget::LowRes(_) => (ldr_format, low_extent),
                PassTarget::SwapchainImage => (swapchain.format(), full_extent),
            };

            let attachment_views: Vec<Vec<vk::ImageView>> = match io.target {
                PassTarget::GeometryColor => (0..image_count)
                    .map(|i| vec![geometry_color[i].view, geometry_depth[i].view])
                    .collect(),
                PassTarget::HighRes(index) => (0..image_count)
                    .map(|_| vec![high_res[index].view])
                    .collect(),
                PassTarget::TonemapOutput => (0..image_count)
                    .map(|_| vec![tonemap_target.view])
                    .collect(),
                PassTarget::LowRes(index) => (0..image_count)
                    .map(|_| vec![low_res[index].view])
                    .collect(),
                PassTarget::SwapchainImage => swapchain
                    .image_views()
                    .iter()
                    .map(|&view| vec![view])
                    .collect(),
            };

            bundles.push(RenderPassBundle::new(
                ctx.clone(),
                node,
                color_format,
                extent,
                &attachment_views,
            )?);
        }

        mage_debug!(
            "mage::vulkan",
            "Pass graph realized: {} passes, {} swapchain images",
            bundles.len(),
            image_count
        );

        let realized = Self {
            graph: graph.clone(),
            schedule,
            full_extent,
            geometry_color,
            geometry_depth,
            high_res,
            tonemap_target,
            low_res,
            compute_images,
            bundles,
        };

        realized.check_invariants(image_count)?;
        Ok(realized)
    }

    /// Re-check the structural invariants after realization: every bundle
    /// has exactly one framebuffer per swapchain image, its color format
    /// matches the node's declared format, and every attachment carries the
    /// format and extent its render pass expects.
    fn check_invariants(&self, image_count: usize) -> Result<()> {
        for (node, bundle) in self.graph.nodes().iter().zip(&self.bundles) {
            if bundle.framebuffers.len() != image_count {
                return Err(Error::Configuration(format!(
                    "Pass '{}' has {} framebuffers for {} swapchain images",
                    node.name,
                    bundle.framebuffers.len(),
                    image_count
                )));
            }
            if let Some(declared) = node.color_format {
                if bundle.color_format != format_to_vk(declared) {
                    return Err(Error::Configuration(format!(
                        "Pass '{}' framebuffer format {:?} does not match declared {:?}",
                        node.name, bundle.color_format, declared
                    )));
                }
            }
        }

        let hdr_format = self.bundles[0].color_format;
        let full_extent = self.full_extent;

        for (kind, attachments) in [
            ("geometry color", &self.geometry_color),
            ("high-res", &self.high_res),
        ] {
            for attachment in attachments.iter() {
                if attachment.format != hdr_format {
                    return Err(Error::Configuration(format!(
                        "{} attachment format {:?} does not match pass format {:?}",
                        kind, attachment.format, hdr_format
                    )));
                }
                if attachment.extent != full_extent {
                    return Err(Error::Configuration(format!(
                        "{} attachment extent mismatch",
                        kind
                    )));
                }
            }
        }

        if self.geometry_depth.len() != image_count {
            return Err(Error::Configuration(format!(
                "{} depth attachments for {} swapchain images",
                self.geometry_depth.len(),
                image_count
            )));
        }
        for attachment in &self.geometry_depth {
            if attachment.format != vk::Format::D32_SFLOAT {
                return Err(Error::Configuration(format!(
                    "Depth attachment format {:?} is not D32_SFLOAT",
                    attachment.format
                )));
            }
        }

        if self.tonemap_target.format == hdr_format {
            return Err(Error::Configuration(
                "Tonemap target must be the 8-bit display format, not the high-precision format"
                    .to_string(),
            ));
        }
        for attachment in &self.low_res {
            if attachment.format != self.tonemap_target.format {
                return Err(Error::Configuration(
                    "Low-res attachment format does not match the tonemap output".to_string(),
                ));
            }
        }

        Ok(())
    }

    // ===== ACCESSORS =====

    pub(crate) fn schedule(&self) -> &[PassIo] {
        &self.schedule
    }

    pub(crate) fn full_extent(&self) -> vk::Extent2D {
        self.full_extent
    }

    /// Bundle for the node at `index` (execution order)
    pub(crate) fn bundle(&self, index: usize) -> &RenderPassBundle {
        &self.bundles[index]
    }

    /// The view a pass samples from, for descriptor writes.
    ///
    /// `image_index` only matters for `GeometryColor` sources (geometry
    /// targets are per swapchain image); shared targets ignore it.
    pub(crate) fn source_view(
        &self,
        source: PassSource,
        image_index: usize,
    ) -> Option<vk::ImageView> {
        match source {
            PassSource::None => None,
            PassSource::GeometryColor => self.geometry_color.get(image_index).map(|a| a.view),
            PassSource::HighRes(index) => self.high_res.get(index).map(|a| a.view),
            PassSource::TonemapOutput => Some(self.tonemap_target.view),
            PassSource::LowRes(index) => self.low_res.get(index).map(|a| a.view),
        }
    }

    /// Storage image view for a frame slot's compute dispatch
    pub(crate) fn compute_image_view(&self, frame_slot: usize) -> vk::ImageView {
        self.compute_images[frame_slot].view
    }

    /// Framebuffer counts per bundle, for the realization invariant
    pub(crate) fn framebuffer_counts(&self) -> Vec<usize> {
        self.bundles.iter().map(|b| b.framebuffers.len()).collect()
    }

    /// Descriptor pool requirement of the graph's own sets: one sampled
    /// source per post-ish stage, the per-image composite inputs, and the
    /// per-slot compute images.
    pub(crate) fn pool_requirement(&self, image_count: usize) -> crate::vulkan_descriptors::PoolSizes {
        let sampled_stages = self.sampled_stage_count();
        crate::vulkan_descriptors::PoolSizes {
            uniform_buffers: 0,
            combined_image_samplers: (sampled_stages
                + image_count as u32
                + MAX_FRAMES_IN_FLIGHT as u32),
            storage_images: MAX_FRAMES_IN_FLIGHT as u32,
            sets: sampled_stages + image_count as u32 + MAX_FRAMES_IN_FLIGHT as u32,
        }
    }

    /// Number of nodes that sample a single fixed source (post stages,
    /// tonemap, final composite)
    pub(crate) fn sampled_stage_count(&self) -> u32 {
        self.graph
            .nodes()
            .iter()
            .filter(|n| {
                matches!(
                    n.kind,
                    PassKind::PostProcess | PassKind::Tonemap | PassKind::FinalComposite
                )
            })
            .count() as u32
    }

    /// Stage index per node: `Some(stage)` for nodes that sample a single
    /// fixed source, assigned serially in execution order.
    pub(crate) fn sampled_stage_indices(&self) -> Vec<Option<u32>> {
        let mut next = 0u32;
        self.graph
            .nodes()
            .iter()
            .map(|n| match n.kind {
                PassKind::PostProcess | PassKind::Tonemap | PassKind::FinalComposite => {
                    let index = next;
                    next += 1;
                    Some(index)
                }
                _ => None,
            })
            .collect()
    }
}
