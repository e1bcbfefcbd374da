/// Tests for formats and the closed transition table

use super::*;

// ============================================================================
// Tests: Format classification
// ============================================================================

#[test]
fn test_depth_format_classification() {
    assert!(TextureFormat::D32_SFLOAT.is_depth());
    assert!(!TextureFormat::R8G8B8A8_UNORM.is_depth());
    assert!(!TextureFormat::R32G32B32A32_SFLOAT.is_depth());
}

#[test]
fn test_high_precision_classification() {
    assert!(TextureFormat::R32G32B32A32_SFLOAT.is_high_precision());
    assert!(TextureFormat::R16G16B16A16_SFLOAT.is_high_precision());
    assert!(!TextureFormat::R8G8B8A8_UNORM.is_high_precision());
    assert!(!TextureFormat::B8G8R8A8_SRGB.is_high_precision());
}

// ============================================================================
// Tests: Transition table
// ============================================================================

#[test]
fn test_pass_handoff_transitions_supported() {
    assert!(is_supported_transition(
        ImageLayout::ColorAttachment,
        ImageLayout::ShaderReadOnly
    ));
    assert!(is_supported_transition(
        ImageLayout::ShaderReadOnly,
        ImageLayout::ColorAttachment
    ));
}

#[test]
fn test_presentation_transition_supported() {
    assert!(is_supported_transition(
        ImageLayout::ColorAttachment,
        ImageLayout::PresentSrc
    ));
}

#[test]
fn test_upload_transitions_supported() {
    assert!(is_supported_transition(ImageLayout::Undefined, ImageLayout::TransferDst));
    assert!(is_supported_transition(ImageLayout::TransferDst, ImageLayout::TransferSrc));
    assert!(is_supported_transition(ImageLayout::TransferSrc, ImageLayout::ShaderReadOnly));
}

#[test]
fn test_unsupported_transition_rejected() {
    assert!(!is_supported_transition(
        ImageLayout::PresentSrc,
        ImageLayout::DepthStencilAttachment
    ));
    assert!(!is_supported_transition(ImageLayout::General, ImageLayout::PresentSrc));
}

#[test]
fn test_check_transition_error_is_fatal_configuration() {
    let result = check_transition(ImageLayout::PresentSrc, ImageLayout::TransferDst);
    match result {
        Err(err) => {
            assert!(matches!(err, crate::error::Error::Configuration(_)));
            assert!(!err.is_recoverable());
        }
        Ok(()) => panic!("expected unsupported transition to be rejected"),
    }
}

#[test]
fn test_undefined_is_never_a_destination() {
    for &(_, to) in SUPPORTED_TRANSITIONS {
        assert_ne!(to, ImageLayout::Undefined);
    }
}

#[test]
fn test_table_has_no_identity_transitions() {
    for &(from, to) in SUPPORTED_TRANSITIONS {
        assert_ne!(from, to);
    }
}
