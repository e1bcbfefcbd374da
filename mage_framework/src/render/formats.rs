//! Texture formats, image layouts, and the closed layout-transition table
//!
//! The transition table is a deliberate closed set, not a general-purpose
//! barrier builder: every layout change the frame pipeline performs is listed
//! here, and requesting a pair outside the table is a fatal configuration
//! error at both description-validation time and barrier-emission time.

use crate::error::{Error, Result};

/// Texture and attachment formats used by the frame pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    D32_SFLOAT,
}

impl TextureFormat {
    /// True for depth formats
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::D32_SFLOAT)
    }

    /// True for the high-precision intermediate formats used before tonemap
    pub fn is_high_precision(&self) -> bool {
        matches!(
            self,
            TextureFormat::R16G16B16A16_SFLOAT | TextureFormat::R32G32B32A32_SFLOAT
        )
    }
}

/// Image layouts the frame pipeline moves attachments through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    /// Contents undefined; only valid as a transition source
    Undefined,
    /// General layout (compute storage images)
    General,
    /// Color attachment write
    ColorAttachment,
    /// Depth/stencil attachment write
    DepthStencilAttachment,
    /// Sampled in a fragment shader
    ShaderReadOnly,
    /// Transfer source (mip generation, present blit)
    TransferSrc,
    /// Transfer destination (staging upload)
    TransferDst,
    /// Ready for presentation
    PresentSrc,
}

/// The closed set of supported layout transitions.
///
/// Pairs not in this table are rejected with a fatal configuration error.
pub const SUPPORTED_TRANSITIONS: &[(ImageLayout, ImageLayout)] = &[
    // Attachment initialization
    (ImageLayout::Undefined, ImageLayout::ColorAttachment),
    (ImageLayout::Undefined, ImageLayout::DepthStencilAttachment),
    (ImageLayout::Undefined, ImageLayout::General),
    (ImageLayout::Undefined, ImageLayout::TransferDst),
    (ImageLayout::Undefined, ImageLayout::ShaderReadOnly),
    // Staging upload and mip generation
    (ImageLayout::TransferDst, ImageLayout::TransferSrc),
    (ImageLayout::TransferDst, ImageLayout::ShaderReadOnly),
    (ImageLayout::TransferSrc, ImageLayout::ShaderReadOnly),
    // Pass-to-pass handoff
    (ImageLayout::ColorAttachment, ImageLayout::ShaderReadOnly),
    (ImageLayout::ShaderReadOnly, ImageLayout::ColorAttachment),
    (ImageLayout::General, ImageLayout::ShaderReadOnly),
    (ImageLayout::ShaderReadOnly, ImageLayout::General),
    // Presentation
    (ImageLayout::ColorAttachment, ImageLayout::PresentSrc),
    (ImageLayout::ColorAttachment, ImageLayout::TransferSrc),
];

/// True if the pair is in the supported transition table
pub fn is_supported_transition(from: ImageLayout, to: ImageLayout) -> bool {
    SUPPORTED_TRANSITIONS.contains(&(from, to))
}

/// Validate a transition pair, rejecting unsupported pairs as fatal
///
/// # Errors
///
/// Returns `Error::Configuration` for any pair outside the table.
pub fn check_transition(from: ImageLayout, to: ImageLayout) -> Result<()> {
    if is_supported_transition(from, to) {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "Unsupported image layout transition: {:?} -> {:?}",
            from, to
        )))
    }
}

#[cfg(test)]
#[path = "formats_tests.rs"]
mod tests;
