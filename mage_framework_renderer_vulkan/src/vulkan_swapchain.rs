/// Swapchain - presentation surface management
///
/// Manages presentation to the window, completely separated from rendering
/// logic: image acquisition, presentation, and swapchain recreation on
/// resize. Synchronization primitives live in `FrameSync`, indexed by frame
/// slot; the swapchain only deals in image indices.

use ash::vk;
use std::sync::Arc;

use mage_framework::mage::{Error, Result};
use mage_framework::{mage_err, mage_info, mage_warn};

use crate::vulkan_context::GpuContext;

/// Vulkan swapchain implementation
pub(crate) struct Swapchain {
    ctx: Arc<GpuContext>,
    physical_device: vk::PhysicalDevice,

    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create the swapchain for a freshly-created surface
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        physical_device: vk::PhysicalDevice,
        instance: &ash::Instance,
        entry: &ash::Entry,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        unsafe {
            let surface_loader = ash::khr::surface::Instance::new(entry, instance);

            let surface_capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to get surface capabilities: {:?}", e))?;

            let surface_formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to get surface formats: {:?}", e))?;

            if surface_formats.is_empty() {
                return Err(Error::Configuration(
                    "Surface reports no supported formats".to_string(),
                ));
            }

            let surface_format = surface_formats
                .iter()
                .find(|f| {
                    f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB
                })
                .unwrap_or(&surface_formats[0]);

            let extent = surface_capabilities.current_extent;

            // Triple buffering where the surface allows it
            let mut image_count = surface_capabilities.min_image_count.max(3);
            if surface_capabilities.max_image_count > 0 {
                image_count = image_count.min(surface_capabilities.max_image_count);
            }

            let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(surface)
                .min_image_count(image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(surface_capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true);

            let swapchain_loader = ash::khr::swapchain::Device::new(instance, &ctx.device);
            let swapchain = swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create swapchain: {:?}", e))?;

            let images = swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to get swapchain images: {:?}", e))?;

            let image_views = create_image_views(&ctx.device, &images, surface_format.format)?;

            mage_info!(
                "mage::vulkan",
                "Swapchain created: {}x{}, {} images, format {:?}",
                extent.width,
                extent.height,
                images.len(),
                surface_format.format
            );

            Ok(Self {
                ctx,
                physical_device,
                surface,
                surface_loader,
                swapchain,
                swapchain_loader,
                images,
                image_views,
                format: surface_format.format,
                extent,
            })
        }
    }

    /// Acquire the next presentable image, signaling `signal_semaphore`.
    ///
    /// Suboptimal is treated as success (deferred resize).
    ///
    /// # Errors
    ///
    /// Returns `Error::SurfaceOutOfDate` when the swapchain no longer matches
    /// the surface; the caller MUST run the full resize path before
    /// continuing.
    pub(crate) fn acquire_next_image(&self, signal_semaphore: vk::Semaphore) -> Result<u32> {
        unsafe {
            match self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                signal_semaphore,
                vk::Fence::null(),
            ) {
                Ok((image_index, _suboptimal)) => Ok(image_index),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    mage_warn!("mage::vulkan", "Swapchain out of date during acquire");
                    Err(Error::SurfaceOutOfDate)
                }
                Err(e) => Err(mage_err!("mage::vulkan", "Failed to acquire swapchain image: {:?}", e)),
            }
        }
    }

    /// Present `image_index`, gated on `wait_semaphore`.
    ///
    /// # Errors
    ///
    /// Returns `Error::SurfaceOutOfDate` on out-of-date AND suboptimal
    /// results; both require the resize path.
    pub(crate) fn present(&self, image_index: u32, wait_semaphore: vk::Semaphore) -> Result<()> {
        unsafe {
            let swapchains = [self.swapchain];
            let image_indices = [image_index];
            let wait_semaphores = [wait_semaphore];

            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            match self
                .swapchain_loader
                .queue_present(self.ctx.present_queue, &present_info)
            {
                Ok(false) => Ok(()),
                Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    mage_warn!("mage::vulkan", "Swapchain out of date during present");
                    Err(Error::SurfaceOutOfDate)
                }
                Err(e) => Err(mage_err!("mage::vulkan", "Failed to present swapchain image: {:?}", e)),
            }
        }
    }

    /// Recreate the swapchain for a new window extent.
    ///
    /// The caller is responsible for the zero-extent gate (minimized window)
    /// and for waiting the device idle first.
    pub(crate) fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            for &view in &self.image_views {
                self.ctx.device.destroy_image_view(view, None);
            }
            self.image_views.clear();

            let surface_capabilities = self
                .surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to get surface capabilities during recreate: {:?}", e))?;

            let extent = if surface_capabilities.current_extent.width != u32::MAX {
                surface_capabilities.current_extent
            } else {
                vk::Extent2D {
                    width: width.clamp(
                        surface_capabilities.min_image_extent.width,
                        surface_capabilities.max_image_extent.width,
                    ),
                    height: height.clamp(
                        surface_capabilities.min_image_extent.height,
                        surface_capabilities.max_image_extent.height,
                    ),
                }
            };

            let mut image_count = surface_capabilities.min_image_count.max(3);
            if surface_capabilities.max_image_count > 0 {
                image_count = image_count.min(surface_capabilities.max_image_count);
            }

            let old_swapchain = self.swapchain;
            let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(image_count)
                .image_format(self.format)
                .image_color_space(vk::ColorSpaceKHR::SRGB_NONLINEAR)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(surface_capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(vk::PresentModeKHR::FIFO)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self
                .swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to recreate swapchain: {:?}", e))?;

            self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            self.swapchain = swapchain;
            self.extent = extent;

            self.images = self
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to get swapchain images during recreate: {:?}", e))?;

            self.image_views = create_image_views(&self.ctx.device, &self.images, self.format)?;

            mage_info!(
                "mage::vulkan",
                "Swapchain recreated: {}x{}, {} images",
                extent.width,
                extent.height,
                self.images.len()
            );

            Ok(())
        }
    }

    pub(crate) fn image_count(&self) -> usize {
        self.images.len()
    }

    pub(crate) fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub(crate) fn format(&self) -> vk::Format {
        self.format
    }

    pub(crate) fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

fn create_image_views(
    device: &ash::Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>> {
    let mut views = Vec::with_capacity(images.len());
    for &image in images {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = unsafe {
            device
                .create_image_view(&create_info, None)
                .map_err(|e| {
                    // Release the views created so far before propagating
                    for &created in &views {
                        device.destroy_image_view(created, None);
                    }
                    mage_err!("mage::vulkan", "Failed to create swapchain image view: {:?}", e)
                })?
        };
        views.push(view);
    }
    Ok(views)
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();

            for &view in &self.image_views {
                self.ctx.device.destroy_image_view(view, None);
            }

            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
