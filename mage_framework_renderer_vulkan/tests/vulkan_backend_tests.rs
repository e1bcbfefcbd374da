//! Integration tests for the Vulkan backend
//!
//! These tests verify the backend's structural invariants against a real
//! device. All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_backend_tests -- --ignored

use mage_framework::glam::Mat4;
use mage_framework::mage::config::PostProcessConfig;
use mage_framework::mage::render::MAX_FRAMES_IN_FLIGHT;
use mage_framework::mage::{MeshData, TextureData};
use mage_framework_renderer_vulkan::mage::{
    BackendConfig, DslKind, ModelAsset, VulkanBackend,
};
use serial_test::serial;
use winit::event_loop::EventLoop;
use winit::window::Window;

/// Helper to create a test window for Vulkan
#[allow(deprecated)]
fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = EventLoop::new().unwrap();
    let window_attrs = Window::default_attributes()
        .with_title("Mage Backend Test")
        .with_inner_size(winit::dpi::LogicalSize::new(800, 600))
        .with_visible(false); // Hidden window for tests
    let window = event_loop.create_window(window_attrs).unwrap();
    (window, event_loop)
}

fn test_config() -> BackendConfig {
    BackendConfig {
        app_name: "Mage Backend Test".to_string(),
        shader_dir: "../mage_demo/shaders".into(),
        post_process: PostProcessConfig {
            high_res_stages: vec!["txaa".to_string()],
            low_res_stages: vec!["vignette".to_string()],
        },
    }
}

fn house_asset() -> ModelAsset {
    ModelAsset {
        name: "house".to_string(),
        mesh: MeshData::unit_cube(),
        texture: TextureData::checkerboard(64, 64, 8),
        transform: Mat4::IDENTITY,
    }
}

// ============================================================================
// SYNCHRONIZATION INVARIANTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_sync_arrays_match_frames_in_flight() {
    let (window, _event_loop) = create_test_window();
    let backend = VulkanBackend::new(&window, (800, 600), test_config()).unwrap();

    // Every per-frame sync array has MAX_FRAMES_IN_FLIGHT entries,
    // independent of the swapchain image count
    for count in backend.sync_object_counts() {
        assert_eq!(count, MAX_FRAMES_IN_FLIGHT);
    }

    // The declared submission chain is valid and in the fixed order
    backend.submission_plan().validate().unwrap();
    let names: Vec<&str> = backend
        .submission_plan()
        .nodes()
        .iter()
        .map(|n| n.name.as_str())
        .collect();
    assert_eq!(names, vec!["compute", "graphics", "post_process", "ui", "present"]);
}

// ============================================================================
// PASS GRAPH REALIZATION
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_every_bundle_has_one_framebuffer_per_image() {
    let (window, _event_loop) = create_test_window();
    let mut backend = VulkanBackend::new(&window, (800, 600), test_config()).unwrap();
    backend.initialize(vec![house_asset()]).unwrap();

    let image_count = backend.swapchain_image_count();
    let counts = backend.framebuffer_counts();

    assert_eq!(counts.len(), backend.frame_graph().nodes().len());
    for count in counts {
        assert_eq!(count, image_count);
    }

    // Every layout kind exists exactly once in the registry
    let registry = backend.descriptor_registry().unwrap();
    for kind in [
        DslKind::Camera,
        DslKind::Model,
        DslKind::Time,
        DslKind::ComputeImage,
        DslKind::Composite,
        DslKind::PostProcess(0),
    ] {
        assert!(registry.layout(kind).is_some(), "missing layout {:?}", kind);
    }
}

// ============================================================================
// RESIZE / RECREATE
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_rebuild_is_idempotent_for_same_extent() {
    let (window, _event_loop) = create_test_window();
    let mut backend = VulkanBackend::new(&window, (800, 600), test_config()).unwrap();
    backend.initialize(vec![house_asset()]).unwrap();

    let graph_before = backend.frame_graph().clone();
    let counts_before = backend.framebuffer_counts();

    assert!(backend.rebuild_swapchain_resources().unwrap());
    assert!(backend.rebuild_swapchain_resources().unwrap());

    assert_eq!(*backend.frame_graph(), graph_before);
    assert_eq!(backend.framebuffer_counts(), counts_before);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_rebuild_defers_while_minimized() {
    let (window, _event_loop) = create_test_window();
    let mut backend = VulkanBackend::new(&window, (800, 600), test_config()).unwrap();
    backend.initialize(vec![house_asset()]).unwrap();

    // Zero extent: recreation must not proceed
    backend.note_window_resized(0, 0);
    assert!(!backend.rebuild_swapchain_resources().unwrap());

    // Restored: recreation proceeds
    backend.note_window_resized(800, 600);
    assert!(backend.rebuild_swapchain_resources().unwrap());
}

// ============================================================================
// END-TO-END DESCRIPTOR CONTRACT
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_model_descriptor_sets_are_distinct_per_frame() {
    let (window, _event_loop) = create_test_window();
    let mut backend = VulkanBackend::new(&window, (800, 600), test_config()).unwrap();
    backend.initialize(vec![house_asset()]).unwrap();

    let scene = backend.scene().unwrap();

    let mut sets = Vec::new();
    for frame in 0..MAX_FRAMES_IN_FLIGHT {
        let set = scene
            .descriptor_set(DslKind::Model, frame, "house")
            .expect("model set must exist for every frame slot");
        sets.push(set);
    }

    // Each frame slot owns a distinct set (distinct backing buffer)
    for a in 0..sets.len() {
        for b in (a + 1)..sets.len() {
            assert_ne!(sets[a], sets[b]);
        }
    }

    // Unknown keys and non-model kinds miss without panicking
    assert!(scene.descriptor_set(DslKind::Model, 0, "missing").is_none());
    assert!(scene.descriptor_set(DslKind::Camera, 0, "house").is_none());
}
