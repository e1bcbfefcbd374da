/// Shader module loading

use ash::vk;
use std::io::Cursor;
use std::path::Path;

use mage_framework::mage::{Error, Result};
use mage_framework::mage_err;

/// Owning wrapper around a VkShaderModule
pub(crate) struct ShaderModule {
    device: ash::Device,
    pub(crate) module: vk::ShaderModule,
    pub(crate) stage: vk::ShaderStageFlags,
}

impl ShaderModule {
    /// Create a shader module from SPIR-V bytes
    pub(crate) fn from_bytes(
        device: ash::Device,
        bytes: &[u8],
        stage: vk::ShaderStageFlags,
    ) -> Result<Self> {
        let code = ash::util::read_spv(&mut Cursor::new(bytes))
            .map_err(|e| Error::Configuration(format!("Invalid SPIR-V module: {}", e)))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

        let module = unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(|e| mage_err!("mage::vulkan", "Failed to create shader module: {:?}", e))?
        };

        Ok(Self {
            device,
            module,
            stage,
        })
    }

    /// Load a compiled SPIR-V binary from disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::ResourceNotFound` when the file does not exist.
    pub(crate) fn from_path(
        device: ash::Device,
        path: &Path,
        stage: vk::ShaderStageFlags,
    ) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|_| {
            Error::ResourceNotFound(format!("shader binary '{}'", path.display()))
        })?;
        Self::from_bytes(device, &bytes, stage)
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}
