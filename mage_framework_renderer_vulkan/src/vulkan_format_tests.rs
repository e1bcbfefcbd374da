/// Tests for the framework <-> Vulkan format mapping

use super::*;
use ash::vk;

const ALL_FORMATS: [TextureFormat; 7] = [
    TextureFormat::R8G8B8A8_UNORM,
    TextureFormat::R8G8B8A8_SRGB,
    TextureFormat::B8G8R8A8_UNORM,
    TextureFormat::B8G8R8A8_SRGB,
    TextureFormat::R16G16B16A16_SFLOAT,
    TextureFormat::R32G32B32A32_SFLOAT,
    TextureFormat::D32_SFLOAT,
];

#[test]
fn test_format_round_trip() {
    for format in ALL_FORMATS {
        assert_eq!(vk_to_format(format_to_vk(format)), Some(format));
    }
}

#[test]
fn test_high_precision_maps_to_float_formats() {
    assert_eq!(
        format_to_vk(TextureFormat::R32G32B32A32_SFLOAT),
        vk::Format::R32G32B32A32_SFLOAT
    );
    assert_eq!(
        format_to_vk(TextureFormat::R16G16B16A16_SFLOAT),
        vk::Format::R16G16B16A16_SFLOAT
    );
}

#[test]
fn test_unknown_vk_format_is_none() {
    assert_eq!(vk_to_format(vk::Format::R5G6B5_UNORM_PACK16), None);
    assert_eq!(vk_to_format(vk::Format::UNDEFINED), None);
}
