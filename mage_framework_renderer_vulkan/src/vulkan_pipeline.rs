/// PipelineFactory - graphics, compute, and post-process pipeline creation
///
/// Fixed-function state is hard-coded per pipeline class; there is no
/// dynamic state negotiation, and any change requires a full pipeline
/// rebuild. A pipeline layout's descriptor-set-layout list must exactly
/// match, in order, the sets bound at draw/dispatch time; the
/// `DslKind` slot lists in `vulkan_frame_scheduler` are the other half of
/// that contract.

use ash::vk;
use std::sync::Arc;

use mage_framework::mage::{Result, Vertex};
use mage_framework::mage_err;

use crate::vulkan_context::GpuContext;
use crate::vulkan_shader::ShaderModule;

/// Fixed-function state class of a graphics pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipelineClass {
    /// Scene rasterization: back-face culling, depth test + write
    Geometry,
    /// Fullscreen post-process pass: no culling, no depth
    PostProcess,
    /// Tonemap: fullscreen, no culling, no depth
    Tonemap,
    /// Composite passes (compute composite, final composite): fullscreen
    Composite,
}

impl PipelineClass {
    fn cull_mode(self) -> vk::CullModeFlags {
        match self {
            PipelineClass::Geometry => vk::CullModeFlags::BACK,
            _ => vk::CullModeFlags::NONE,
        }
    }

    fn depth_enabled(self) -> bool {
        matches!(self, PipelineClass::Geometry)
    }

    fn uses_vertex_input(self) -> bool {
        matches!(self, PipelineClass::Geometry)
    }
}

/// Immutable pipeline + layout pair
pub(crate) struct Pipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

/// Pipeline creation entry points
pub(crate) struct PipelineFactory {
    ctx: Arc<GpuContext>,
}

impl PipelineFactory {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Self {
        Self { ctx }
    }

    /// Create a graphics pipeline bound to a render pass and subpass 0.
    ///
    /// `set_layouts` is the ordered descriptor-set-layout list; the frame
    /// scheduler binds sets in exactly this order at draw time.
    pub(crate) fn create_graphics_pipeline(
        &self,
        class: PipelineClass,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
        render_pass: vk::RenderPass,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Pipeline> {
        unsafe {
            let layout = self.create_pipeline_layout(set_layouts)?;

            let entry_point = c"main";
            let shader_stages = [
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(vertex_shader.stage)
                    .module(vertex_shader.module)
                    .name(entry_point),
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(fragment_shader.stage)
                    .module(fragment_shader.module)
                    .name(entry_point),
            ];

            // Vertex input: interleaved scene vertices for geometry,
            // empty for screen-space-quad passes
            let vertex_bindings = [vk::VertexInputBindingDescription {
                binding: 0,
                stride: std::mem::size_of::<Vertex>() as u32,
                input_rate: vk::VertexInputRate::VERTEX,
            }];
            let vertex_attributes = [
                vk::VertexInputAttributeDescription {
                    location: 0,
                    binding: 0,
                    format: vk::Format::R32G32B32_SFLOAT,
                    offset: 0,
                },
                vk::VertexInputAttributeDescription {
                    location: 1,
                    binding: 0,
                    format: vk::Format::R32G32B32_SFLOAT,
                    offset: 12,
                },
                vk::VertexInputAttributeDescription {
                    location: 2,
                    binding: 0,
                    format: vk::Format::R32G32_SFLOAT,
                    offset: 24,
                },
            ];

            let vertex_input_state = if class.uses_vertex_input() {
                vk::PipelineVertexInputStateCreateInfo::default()
                    .vertex_binding_descriptions(&vertex_bindings)
                    .vertex_attribute_descriptions(&vertex_attributes)
            } else {
                vk::PipelineVertexInputStateCreateInfo::default()
            };

            let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
                .primitive_restart_enable(false);

            // Viewport state (dynamic)
            let viewports = [vk::Viewport::default()];
            let scissors = [vk::Rect2D::default()];
            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewports(&viewports)
                .scissors(&scissors);

            let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(vk::PolygonMode::FILL)
                .line_width(1.0)
                .cull_mode(class.cull_mode())
                .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
                .depth_bias_enable(false);

            let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(class.depth_enabled())
                .depth_write_enable(class.depth_enabled())
                .depth_compare_op(vk::CompareOp::LESS)
                .depth_bounds_test_enable(false)
                .stencil_test_enable(false);

            let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
                .sample_shading_enable(false)
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            // Blending disabled by default across all classes
            let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(false);

            let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .attachments(std::slice::from_ref(&color_blend_attachment));

            let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
            let dynamic_state =
                vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

            let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&shader_stages)
                .vertex_input_state(&vertex_input_state)
                .input_assembly_state(&input_assembly_state)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization_state)
                .depth_stencil_state(&depth_stencil_state)
                .multisample_state(&multisample_state)
                .color_blend_state(&color_blend_state)
                .dynamic_state(&dynamic_state)
                .layout(layout)
                .render_pass(render_pass)
                .subpass(0);

            let pipelines = self
                .ctx
                .device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
                .map_err(|e| {
                    self.ctx.device.destroy_pipeline_layout(layout, None);
                    mage_err!("mage::vulkan", "Failed to create graphics pipeline: {:?}", e.1)
                })?;

            Ok(Pipeline {
                ctx: self.ctx.clone(),
                pipeline: pipelines[0],
                layout,
            })
        }
    }

    /// Create a post-process pipeline: fullscreen triangle, empty vertex
    /// input, no depth
    pub(crate) fn create_post_process_pipeline(
        &self,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
        render_pass: vk::RenderPass,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Pipeline> {
        self.create_graphics_pipeline(
            PipelineClass::PostProcess,
            vertex_shader,
            fragment_shader,
            render_pass,
            set_layouts,
        )
    }

    /// Create a compute pipeline
    pub(crate) fn create_compute_pipeline(
        &self,
        shader: &ShaderModule,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Pipeline> {
        unsafe {
            let layout = self.create_pipeline_layout(set_layouts)?;

            let stage = vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::COMPUTE)
                .module(shader.module)
                .name(c"main");

            let create_info = vk::ComputePipelineCreateInfo::default()
                .stage(stage)
                .layout(layout);

            let pipelines = self
                .ctx
                .device
                .create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|e| {
                    self.ctx.device.destroy_pipeline_layout(layout, None);
                    mage_err!("mage::vulkan", "Failed to create compute pipeline: {:?}", e.1)
                })?;

            Ok(Pipeline {
                ctx: self.ctx.clone(),
                pipeline: pipelines[0],
                layout,
            })
        }
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<vk::PipelineLayout> {
        let layout_create_info =
            vk::PipelineLayoutCreateInfo::default().set_layouts(set_layouts);

        unsafe {
            self.ctx
                .device
                .create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create pipeline layout: {:?}", e))
        }
    }
}
