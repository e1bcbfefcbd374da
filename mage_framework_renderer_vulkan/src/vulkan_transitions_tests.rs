/// Tests for the closed transition table (no GPU required)

use super::*;
use mage_framework::mage::render::SUPPORTED_TRANSITIONS;

#[test]
fn test_every_supported_transition_has_masks() {
    // The Vulkan table must cover exactly the pairs the framework declares
    for &(from, to) in SUPPORTED_TRANSITIONS {
        assert!(
            barrier_masks(from, to).is_ok(),
            "declared transition {:?} -> {:?} has no barrier masks",
            from,
            to
        );
    }
}

#[test]
fn test_unsupported_transition_is_configuration_error() {
    let result = barrier_masks(ImageLayout::PresentSrc, ImageLayout::General);
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_undefined_source_has_empty_src_access() {
    for to in [
        ImageLayout::ColorAttachment,
        ImageLayout::DepthStencilAttachment,
        ImageLayout::General,
        ImageLayout::TransferDst,
        ImageLayout::ShaderReadOnly,
    ] {
        let masks = barrier_masks(ImageLayout::Undefined, to).unwrap();
        assert_eq!(masks.src_access, vk::AccessFlags::empty());
        assert_eq!(masks.src_stage, vk::PipelineStageFlags::TOP_OF_PIPE);
    }
}

#[test]
fn test_pass_handoff_masks() {
    let masks =
        barrier_masks(ImageLayout::ColorAttachment, ImageLayout::ShaderReadOnly).unwrap();
    assert_eq!(masks.src_access, vk::AccessFlags::COLOR_ATTACHMENT_WRITE);
    assert_eq!(masks.dst_access, vk::AccessFlags::SHADER_READ);
    assert_eq!(masks.src_stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
    assert_eq!(masks.dst_stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
}

#[test]
fn test_present_transition_reaches_bottom_of_pipe() {
    let masks = barrier_masks(ImageLayout::ColorAttachment, ImageLayout::PresentSrc).unwrap();
    assert_eq!(masks.dst_access, vk::AccessFlags::empty());
    assert_eq!(masks.dst_stage, vk::PipelineStageFlags::BOTTOM_OF_PIPE);
}

#[test]
fn test_layout_mapping() {
    assert_eq!(layout_to_vk(ImageLayout::Undefined), vk::ImageLayout::UNDEFINED);
    assert_eq!(
        layout_to_vk(ImageLayout::ColorAttachment),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    );
    assert_eq!(
        layout_to_vk(ImageLayout::PresentSrc),
        vk::ImageLayout::PRESENT_SRC_KHR
    );
    assert_eq!(layout_to_vk(ImageLayout::General), vk::ImageLayout::GENERAL);
}
