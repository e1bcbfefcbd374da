/// VulkanBackend - device bring-up and resource orchestration
///
/// Owns everything in dependency order: instance → device/queues →
/// allocator → swapchain → sync → pass graph → descriptors → pipelines →
/// per-slot command buffers. `initialize()` builds the frame resources in
/// exactly that order; the resize path tears the resolution-dependent tail
/// down and rebuilds it in the same order. Field declaration order is the
/// reverse destruction order, with the shared `GpuContext` released last.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use std::ffi::CString;
use std::mem::ManuallyDrop;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};

use mage_framework::mage::config::PostProcessConfig;
use mage_framework::mage::render::{FrameGraph, PassKind, SubmissionPlan};
use mage_framework::mage::{Error, Result};
use mage_framework::{mage_err, mage_info};

use crate::vulkan_context::GpuContext;
use crate::vulkan_descriptors::{DescriptorRegistry, DslKind, PoolSizes};
use crate::vulkan_frame_scheduler::SlotCommands;
use crate::vulkan_pass_graph::PassGraph;
use crate::vulkan_pipeline::{Pipeline, PipelineClass, PipelineFactory};
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_scene::{ModelAsset, SceneResources};
use crate::vulkan_shader::ShaderModule;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_sync::{FrameSync, MAX_FRAMES_IN_FLIGHT};
use crate::vulkan_ui::{NullUiOverlay, UiOverlay};
use crate::vulkan_uniforms::{CameraResources, TimeResources};

/// Backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Application name reported to the driver
    pub app_name: String,
    /// Directory containing compiled SPIR-V binaries
    pub shader_dir: PathBuf,
    /// Post-process stage lists
    pub post_process: PostProcessConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            app_name: "Mage Application".to_string(),
            shader_dir: PathBuf::from("shaders"),
            post_process: PostProcessConfig::default(),
        }
    }
}

/// Renderer statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct RendererStats {
    /// Frames presented since startup
    pub frames_rendered: u64,
    /// Full swapchain rebuilds performed
    pub swapchain_rebuilds: u32,
    /// Draw calls recorded per frame
    pub draw_calls_per_frame: u32,
}

/// The Vulkan rendering backend
pub struct VulkanBackend {
    // ===== FRAME ORCHESTRATION (dropped first) =====
    pub(crate) stats: RendererStats,
    pub(crate) ui: Option<Box<dyn UiOverlay>>,
    pub(crate) slots: Vec<SlotCommands>,

    // Pipelines, parallel to graph nodes (None for the UI node)
    pub(crate) pipelines: Vec<Option<Pipeline>>,
    pub(crate) compute_pipeline: Option<Pipeline>,

    // Descriptor sets owned by the pass graph stages
    /// Per node: the sampled-source set of post/tonemap/composite stages
    pub(crate) stage_sets: Vec<Option<vk::DescriptorSet>>,
    /// Per swapchain image: geometry-color input of the compute composite
    pub(crate) composite_sets: Vec<vk::DescriptorSet>,
    /// Per frame slot: compute storage image (written + sampled)
    pub(crate) compute_sets: Vec<vk::DescriptorSet>,

    // ===== RESOURCES =====
    pub(crate) scene: Option<SceneResources>,
    pub(crate) camera_resources: Option<CameraResources>,
    pub(crate) time_resources: Option<TimeResources>,
    pub(crate) registry: Option<DescriptorRegistry>,
    pub(crate) pass_graph: Option<PassGraph>,
    pub(crate) shader_cache: FxHashMap<String, ShaderModule>,
    pub(crate) samplers: SamplerCache,
    pub(crate) pipeline_factory: PipelineFactory,

    // ===== FRAME PROTOCOL =====
    pub(crate) submission_plan: SubmissionPlan,
    pub(crate) frame_graph: FrameGraph,
    pub(crate) sync: FrameSync,
    pub(crate) swapchain: Swapchain,

    pub(crate) config: BackendConfig,
    pub(crate) pending_extent: (u32, u32),

    // Shared context, released last
    pub(crate) ctx: Arc<GpuContext>,
}

impl VulkanBackend {
    /// Create the device-level objects: instance, surface, device, queues,
    /// allocator, swapchain, per-frame sync.
    ///
    /// # Errors
    ///
    /// All failures here are fatal: an unsupported device/extension/queue
    /// combination is a configuration defect, everything else is a backend
    /// failure.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        window_extent: (u32, u32),
        config: BackendConfig,
    ) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| Error::Backend(format!("Failed to load Vulkan library: {:?}", e)))?;

            // Instance
            let app_name = CString::new(config.app_name.as_str())
                .map_err(|_| Error::Configuration("Application name contains NUL".to_string()))?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Mage Framework")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_2);

            let display_handle = window
                .display_handle()
                .map_err(|e| Error::Backend(format!("Failed to get display handle: {}", e)))?;
            #[cfg_attr(not(feature = "vulkan-validation"), allow(unused_mut))]
            let mut extension_names =
                ash_window::enumerate_required_extensions(display_handle.as_raw())
                    .map_err(|e| Error::Backend(format!("Failed to get required extensions: {:?}", e)))?
                    .to_vec();

            #[cfg(feature = "vulkan-validation")]
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());

            #[cfg(feature = "vulkan-validation")]
            let layer_names = vec![c"VK_LAYER_KHRONOS_validation".as_ptr()];
            #[cfg(not(feature = "vulkan-validation"))]
            let layer_names: Vec<*const std::ffi::c_char> = Vec::new();

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create instance: {:?}", e))?;

            #[cfg(feature = "vulkan-validation")]
            let (debug_utils_loader, debug_messenger) =
                crate::debug::create_debug_messenger(&entry, &instance);

            // Surface
            let window_handle = window
                .window_handle()
                .map_err(|e| Error::Backend(format!("Failed to get window handle: {}", e)))?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| mage_err!("mage::vulkan", "Failed to create surface: {:?}", e))?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Physical device + queue families
            let (physical_device, families) =
                pick_physical_device(&instance, &surface_loader, surface)?;

            let device_name = {
                let properties = instance.get_physical_device_properties(physical_device);
                std::ffi::CStr::from_ptr(properties.device_name.as_ptr())
                    .to_string_lossy()
                    .to_string()
            };
            mage_info!("mage::vulkan", "Selected GPU: {}", device_name);

            // Logical device
            let mut unique_families = vec![families.graphics];
            for family in [families.compute, families.present] {
                if !unique_families.contains(&family) {
                    unique_families.push(family);
                }
            }

            let queue_priorities = [1.0f32];
            let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
                .iter()
                .map(|&family| {
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(family)
                        .queue_priorities(&queue_priorities)
                })
                .collect();

            let device_extensions = [ash::khr::swapchain::NAME.as_ptr()];
            let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extensions)
                .enabled_features(&features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create logical device: {:?}", e))?;

            let graphics_queue = device.get_device_queue(families.graphics, 0);
            let compute_queue = device.get_device_queue(families.compute, 0);
            let present_queue = device.get_device_queue(families.present, 0);

            // Allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| mage_err!("mage::vulkan", "Failed to create GPU allocator: {:?}", e))?;

            // One-shot upload pool
            let upload_pool_info = vk::CommandPoolCreateInfo::default()
                .flags(
                    vk::CommandPoolCreateFlags::TRANSIENT
                        | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                )
                .queue_family_index(families.graphics);
            let upload_command_pool = device
                .create_command_pool(&upload_pool_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create upload command pool: {:?}", e))?;

            let ctx = Arc::new(GpuContext {
                device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                graphics_queue,
                graphics_queue_family: families.graphics,
                compute_queue,
                compute_queue_family: families.compute,
                present_queue,
                present_queue_family: families.present,
                upload_command_pool: Mutex::new(upload_command_pool),
                instance,
                _entry: entry.clone(),
                #[cfg(feature = "vulkan-validation")]
                debug_utils_loader,
                #[cfg(feature = "vulkan-validation")]
                debug_messenger,
            });

            // Swapchain + per-frame sync
            let swapchain = Swapchain::new(
                ctx.clone(),
                physical_device,
                &ctx.instance,
                &ctx._entry,
                surface,
            )?;
            let sync = FrameSync::new(ctx.clone())?;

            // Frame protocol descriptions, validated before realization
            let frame_graph = FrameGraph::standard(&config.post_process);
            frame_graph.validate()?;
            let submission_plan = SubmissionPlan::standard();
            submission_plan.validate()?;

            let slots = (0..MAX_FRAMES_IN_FLIGHT)
                .map(|_| SlotCommands::new(ctx.clone()))
                .collect::<Result<Vec<_>>>()?;

            Ok(Self {
                stats: RendererStats::default(),
                ui: None,
                slots,
                pipelines: Vec::new(),
                compute_pipeline: None,
                stage_sets: Vec::new(),
                composite_sets: Vec::new(),
                compute_sets: Vec::new(),
                scene: None,
                camera_resources: None,
                time_resources: None,
                registry: None,
                pass_graph: None,
                shader_cache: FxHashMap::default(),
                samplers: SamplerCache::new(ctx.clone()),
                pipeline_factory: PipelineFactory::new(ctx.clone()),
                submission_plan,
                frame_graph,
                sync,
                swapchain,
                config,
                pending_extent: window_extent,
                ctx,
            })
        }
    }

    /// Upload the scene and build every frame resource in dependency order.
    ///
    /// Must be called once before the first `render_frame`.
    pub fn initialize(&mut self, assets: Vec<ModelAsset>) -> Result<()> {
        self.scene = Some(SceneResources::from_assets(self.ctx.clone(), assets)?);
        self.camera_resources = Some(CameraResources::new(self.ctx.clone())?);
        self.time_resources = Some(TimeResources::new(self.ctx.clone())?);

        if self.ui.is_none() {
            self.ui = Some(Box::new(NullUiOverlay::new(self.ctx.clone())?));
        }

        self.build_frame_resources()?;

        mage_info!(
            "mage::vulkan",
            "Backend initialized: {} passes, {} models, swapchain format {:?}",
            self.frame_graph.nodes().len(),
            self.scene.as_ref().map(|s| s.model_count()).unwrap_or(0),
            crate::vulkan_format::vk_to_format(self.swapchain.format())
        );
        Ok(())
    }

    /// Replace the UI overlay (before `initialize`, or between frames)
    pub fn set_ui_overlay(&mut self, ui: Box<dyn UiOverlay>) {
        self.ui = Some(ui);
    }

    /// Record the latest window extent from the event loop
    pub fn note_window_resized(&mut self, width: u32, height: u32) {
        self.pending_extent = (width, height);
    }

    /// Statistics snapshot
    pub fn stats(&self) -> RendererStats {
        self.stats
    }

    /// Sync-array lengths, for the frame-count invariant
    pub fn sync_object_counts(&self) -> [usize; 6] {
        self.sync.object_counts()
    }

    /// Per-bundle framebuffer counts, for the realization invariant
    pub fn framebuffer_counts(&self) -> Vec<usize> {
        self.pass_graph
            .as_ref()
            .map(|g| g.framebuffer_counts())
            .unwrap_or_default()
    }

    /// Swapchain image count
    pub fn swapchain_image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    /// The realized frame graph description
    pub fn frame_graph(&self) -> &FrameGraph {
        &self.frame_graph
    }

    /// The declared semaphore wait/signal chain the scheduler executes
    pub fn submission_plan(&self) -> &SubmissionPlan {
        &self.submission_plan
    }

    /// Descriptor registry access (layout lookups)
    pub fn descriptor_registry(&self) -> Option<&DescriptorRegistry> {
        self.registry.as_ref()
    }

    /// Scene access (model descriptor lookups, uniform updates)
    pub fn scene(&self) -> Option<&SceneResources> {
        self.scene.as_ref()
    }

    /// Block until the GPU is idle
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| mage_err!("mage::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }

    // ===== FRAME RESOURCE CONSTRUCTION =====

    /// Build (or rebuild) every resolution-dependent resource, in the same
    /// dependency order as startup: pass graph → descriptor registry +
    /// layouts → descriptor sets → pipelines → command recording.
    pub(crate) fn build_frame_resources(&mut self) -> Result<()> {
        // Drop the previous generation first (resize path)
        self.pipelines.clear();
        self.compute_pipeline = None;
        self.stage_sets.clear();
        self.composite_sets.clear();
        self.compute_sets.clear();
        self.registry = None;
        self.pass_graph = None;

        let image_count = self.swapchain.image_count();

        // Pass graph (attachments + render passes + framebuffers)
        let pass_graph = PassGraph::new(self.ctx.clone(), &self.frame_graph, &self.swapchain)?;

        // Descriptor pool sizing: every contributor expands the requirement
        let mut sizes = PoolSizes::default();
        sizes.add(CameraResources::pool_requirement());
        sizes.add(TimeResources::pool_requirement());
        if let Some(scene) = &self.scene {
            scene.expand_descriptor_pool(&mut sizes);
        }
        sizes.add(pass_graph.pool_requirement(image_count));

        let mut registry = DescriptorRegistry::new(self.ctx.clone(), sizes)?;

        // Layouts: exactly once per kind
        registry.create_layout(DslKind::Camera)?;
        registry.create_layout(DslKind::Model)?;
        registry.create_layout(DslKind::Time)?;
        registry.create_layout(DslKind::ComputeImage)?;
        registry.create_layout(DslKind::Composite)?;
        for stage in 0..pass_graph.sampled_stage_count() {
            registry.create_layout(DslKind::PostProcess(stage))?;
        }

        // Per-frame sets: camera, time, models
        self.camera_resources
            .as_mut()
            .ok_or_else(|| Error::Configuration("initialize() not called".to_string()))?
            .create_descriptors(&mut registry)?;
        self.time_resources
            .as_mut()
            .unwrap()
            .create_descriptors(&mut registry)?;
        if let Some(scene) = self.scene.as_mut() {
            scene.create_descriptors(&mut registry)?;
        }
        if let Some(scene) = self.scene.as_ref() {
            scene.write_descriptor_sets(&registry, &mut self.samplers)?;
        }

        // Pass-graph sets: stage sources, composite inputs, compute images
        self.create_pass_descriptors(&mut registry, &pass_graph, image_count)?;

        // Pipelines
        self.create_pipelines(&registry, &pass_graph)?;

        self.registry = Some(registry);
        self.pass_graph = Some(pass_graph);

        // Pre-record every slot against its assumed image index
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            let assumed_image = (slot % image_count) as u32;
            self.record_slot(slot, assumed_image)?;
        }

        Ok(())
    }

    /// Allocate and write the descriptor sets owned by the pass graph
    fn create_pass_descriptors(
        &mut self,
        registry: &mut DescriptorRegistry,
        pass_graph: &PassGraph,
        image_count: usize,
    ) -> Result<()> {
        let clamp_sampler = self.samplers.get(crate::vulkan_sampler::SamplerType::LinearClamp);

        // Sampled-source set per post-ish stage
        let stage_indices = pass_graph.sampled_stage_indices();
        let schedule = pass_graph.schedule();
        let mut stage_sets = vec![None; stage_indices.len()];

        for (node_index, stage) in stage_indices.iter().enumerate() {
            let Some(stage) = stage else { continue };
            let layout = registry.require_layout(DslKind::PostProcess(*stage))?;
            let set = registry.allocate_sets(layout, 1)?[0];

            let view = pass_graph
                .source_view(schedule[node_index].source, 0)
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "Stage {} has no sampled source view",
                        node_index
                    ))
                })?;
            registry.write_combined_image(
                set,
                0,
                view,
                clamp_sampler,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
            stage_sets[node_index] = Some(set);
        }
        self.stage_sets = stage_sets;

        // Composite input (geometry color), one per swapchain image
        let composite_layout = registry.require_layout(DslKind::Composite)?;
        let composite_sets = registry.allocate_sets(composite_layout, image_count)?;
        for (image_index, &set) in composite_sets.iter().enumerate() {
            let view = pass_graph
                .source_view(
                    mage_framework::mage::render::PassSource::GeometryColor,
                    image_index,
                )
                .ok_or_else(|| Error::Configuration("Missing geometry color view".to_string()))?;
            registry.write_combined_image(
                set,
                0,
                view,
                clamp_sampler,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
        }
        self.composite_sets = composite_sets;

        // Compute image set per frame slot: storage write + sampled read
        let compute_sets = registry.allocate_per_frame_sets(DslKind::ComputeImage)?;
        for (slot, &set) in compute_sets.iter().enumerate() {
            let view = pass_graph.compute_image_view(slot);
            registry.write_storage_image(set, 0, view);
            registry.write_combined_image(
                set,
                1,
                view,
                clamp_sampler,
                vk::ImageLayout::GENERAL,
            );
        }
        self.compute_sets = compute_sets;

        Ok(())
    }

    /// The vertex/fragment shader binaries of a graph node's pipeline
    fn node_shader_files(node: &mage_framework::mage::render::PassNode) -> Option<(String, String)> {
        match node.kind {
            PassKind::Geometry => Some((shader_file("scene", "vert"), shader_file("scene", "frag"))),
            PassKind::ComputeComposite => Some((
                shader_file("fullscreen", "vert"),
                shader_file("composite", "frag"),
            )),
            PassKind::Tonemap => Some((
                shader_file("fullscreen", "vert"),
                shader_file("tonemap", "frag"),
            )),
            PassKind::FinalComposite => Some((
                shader_file("fullscreen", "vert"),
                shader_file("present", "frag"),
            )),
            PassKind::PostProcess => Some((
                shader_file("fullscreen", "vert"),
                shader_file(&node.name, "frag"),
            )),
            PassKind::UiOverlay => None,
        }
    }

    /// Create one pipeline per graph node (UI excluded) plus the compute
    /// pipeline
    fn create_pipelines(
        &mut self,
        registry: &DescriptorRegistry,
        pass_graph: &PassGraph,
    ) -> Result<()> {
        // Load every shader the graph needs before building anything
        let mut needed: Vec<String> = vec![shader_file("sky", "comp")];
        for node in self.frame_graph.nodes() {
            if let Some((vert, frag)) = Self::node_shader_files(node) {
                needed.push(vert);
                needed.push(frag);
            }
        }
        for file_name in &needed {
            self.load_shader(file_name)?;
        }

        let stage_indices = pass_graph.sampled_stage_indices();
        let nodes: Vec<_> = self.frame_graph.nodes().to_vec();
        let mut pipelines = Vec::with_capacity(nodes.len());

        for (node_index, node) in nodes.iter().enumerate() {
            let Some((vert_file, frag_file)) = Self::node_shader_files(node) else {
                pipelines.push(None);
                continue;
            };

            let bundle = pass_graph.bundle(node_index);
            let vert = &self.shader_cache[&vert_file];
            let frag = &self.shader_cache[&frag_file];

            let (class, set_layouts) = match node.kind {
                PassKind::Geometry => (
                    PipelineClass::Geometry,
                    vec![
                        registry.require_layout(DslKind::Camera)?,
                        registry.require_layout(DslKind::Model)?,
                        registry.require_layout(DslKind::Time)?,
                    ],
                ),
                PassKind::ComputeComposite => (
                    PipelineClass::Composite,
                    vec![
                        registry.require_layout(DslKind::Composite)?,
                        registry.require_layout(DslKind::ComputeImage)?,
                        registry.require_layout(DslKind::Time)?,
                    ],
                ),
                PassKind::PostProcess | PassKind::Tonemap | PassKind::FinalComposite => {
                    let stage = stage_indices[node_index].ok_or_else(|| {
                        Error::Configuration(format!("Pass '{}' has no stage index", node.name))
                    })?;
                    let class = match node.kind {
                        PassKind::Tonemap => PipelineClass::Tonemap,
                        PassKind::FinalComposite => PipelineClass::Composite,
                        _ => PipelineClass::PostProcess,
                    };
                    (
                        class,
                        vec![
                            registry.require_layout(DslKind::PostProcess(stage))?,
                            registry.require_layout(DslKind::Time)?,
                        ],
                    )
                }
                PassKind::UiOverlay => unreachable!(),
            };

            let pipeline = if class == PipelineClass::PostProcess {
                self.pipeline_factory.create_post_process_pipeline(
                    vert,
                    frag,
                    bundle.render_pass,
                    &set_layouts,
                )?
            } else {
                self.pipeline_factory.create_graphics_pipeline(
                    class,
                    vert,
                    frag,
                    bundle.render_pass,
                    &set_layouts,
                )?
            };
            pipelines.push(Some(pipeline));
        }

        // Compute pipeline (procedural sky written to the storage image)
        let compute_layouts = [
            registry.require_layout(DslKind::ComputeImage)?,
            registry.require_layout(DslKind::Time)?,
        ];
        let compute_pipeline = self.pipeline_factory.create_compute_pipeline(
            &self.shader_cache[&shader_file("sky", "comp")],
            &compute_layouts,
        )?;

        self.pipelines = pipelines;
        self.compute_pipeline = Some(compute_pipeline);
        Ok(())
    }

    /// Load a shader into the cache (no-op when already loaded)
    fn load_shader(&mut self, file_name: &str) -> Result<()> {
        if self.shader_cache.contains_key(file_name) {
            return Ok(());
        }
        let stage = if file_name.ends_with(".vert.spv") {
            vk::ShaderStageFlags::VERTEX
        } else if file_name.ends_with(".frag.spv") {
            vk::ShaderStageFlags::FRAGMENT
        } else {
            vk::ShaderStageFlags::COMPUTE
        };
        let path = self.config.shader_dir.join(file_name);
        let module = ShaderModule::from_path(self.ctx.device.clone(), &path, stage)?;
        self.shader_cache.insert(file_name.to_string(), module);
        Ok(())
    }
}

fn shader_file(name: &str, kind: &str) -> String {
    format!("{}.{}.spv", name, kind)
}

/// Selected queue families
struct QueueFamilies {
    graphics: u32,
    compute: u32,
    present: u32,
}

/// Pick the first device offering graphics + present + swapchain support,
/// preferring discrete GPUs. A dedicated compute-capable family is used for
/// the compute queue when one exists.
fn pick_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
    unsafe {
        let devices = instance
            .enumerate_physical_devices()
            .map_err(|e| mage_err!("mage::vulkan", "Failed to enumerate physical devices: {:?}", e))?;

        let mut fallback: Option<(vk::PhysicalDevice, QueueFamilies)> = None;

        for device in devices {
            let Some(families) = find_queue_families(instance, surface_loader, surface, device)
            else {
                continue;
            };

            let extensions = instance
                .enumerate_device_extension_properties(device)
                .unwrap_or_default();
            let has_swapchain = extensions.iter().any(|ext| {
                std::ffi::CStr::from_ptr(ext.extension_name.as_ptr())
                    == ash::khr::swapchain::NAME
            });
            if !has_swapchain {
                continue;
            }

            let properties = instance.get_physical_device_properties(device);
            if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
                return Ok((device, families));
            }
            if fallback.is_none() {
                fallback = Some((device, families));
            }
        }

        fallback.ok_or_else(|| {
            Error::Configuration(
                "No Vulkan device with graphics, present, and swapchain support".to_string(),
            )
        })
    }
}

fn find_queue_families(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    device: vk::PhysicalDevice,
) -> Option<QueueFamilies> {
    unsafe {
        let families = instance.get_physical_device_queue_family_properties(device);

        let mut graphics = None;
        let mut dedicated_compute = None;
        let mut present = None;

        for (index, family) in families.iter().enumerate() {
            let index = index as u32;
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && graphics.is_none() {
                graphics = Some(index);
            }
            if family.queue_flags.contains(vk::QueueFlags::COMPUTE)
                && !family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                && dedicated_compute.is_none()
            {
                dedicated_compute = Some(index);
            }
            let supports_present = surface_loader
                .get_physical_device_surface_support(device, index, surface)
                .unwrap_or(false);
            if supports_present && present.is_none() {
                present = Some(index);
            }
        }

        let graphics = graphics?;
        let present = present?;
        Some(QueueFamilies {
            graphics,
            compute: dedicated_compute.unwrap_or(graphics),
            present,
        })
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        unsafe {
            // Every subsequent field drop assumes the GPU is done with it
            self.ctx.device.device_wait_idle().ok();
        }
    }
}
