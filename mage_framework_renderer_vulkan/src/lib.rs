/*!
# Mage Framework - Vulkan backend

Realizes the frame pipeline described by `mage_framework` against Vulkan:
device and queue selection, swapchain and per-frame synchronization, GPU
resource allocation, the render-pass graph with its post-process chain, the
pipeline factory, the descriptor registry, and the frame scheduler that
drives submission and presentation every frame.
*/

// Internal modules
mod vulkan_context;
mod vulkan_format;
mod vulkan_transitions;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_sync;
mod vulkan_swapchain;
mod vulkan_descriptors;
mod vulkan_render_pass;
mod vulkan_pass_graph;
mod vulkan_pipeline;
mod vulkan_uniforms;
mod vulkan_scene;
mod vulkan_ui;
mod vulkan_backend;
mod vulkan_frame_scheduler;

#[cfg(feature = "vulkan-validation")]
mod debug;

// Main mage namespace module
pub mod mage {
    pub use crate::vulkan_backend::{BackendConfig, RendererStats, VulkanBackend};
    pub use crate::vulkan_descriptors::{DescriptorRegistry, DslKind, PoolSizes};
    pub use crate::vulkan_scene::{ModelAsset, SceneResources};
    pub use crate::vulkan_sync::MAX_FRAMES_IN_FLIGHT;
    pub use crate::vulkan_ui::{NullUiOverlay, UiOverlay};
}

pub use mage::*;
