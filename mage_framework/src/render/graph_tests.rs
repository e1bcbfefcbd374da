/// Tests for the frame graph description and its validation

use super::*;
use crate::config::PostProcessConfig;

fn post_config(high: &[&str], low: &[&str]) -> PostProcessConfig {
    PostProcessConfig {
        high_res_stages: high.iter().map(|s| s.to_string()).collect(),
        low_res_stages: low.iter().map(|s| s.to_string()).collect(),
    }
}

// ============================================================================
// Tests: Standard graph construction
// ============================================================================

#[test]
fn test_standard_graph_minimal_sequence() {
    let graph = FrameGraph::standard(&post_config(&[], &[]));
    let kinds: Vec<PassKind> = graph.nodes().iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            PassKind::Geometry,
            PassKind::ComputeComposite,
            PassKind::Tonemap,
            PassKind::FinalComposite,
            PassKind::UiOverlay,
        ]
    );
    graph.validate().unwrap();
}

#[test]
fn test_standard_graph_with_stages() {
    let graph = FrameGraph::standard(&post_config(&["txaa", "bloom"], &["vignette"]));
    let names: Vec<&str> = graph.nodes().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "geometry",
            "compute_composite",
            "txaa",
            "bloom",
            "tonemap",
            "vignette",
            "final_composite",
            "ui_overlay",
        ]
    );
    graph.validate().unwrap();
}

#[test]
fn test_standard_graph_format_discipline() {
    let graph = FrameGraph::standard(&post_config(&["txaa"], &["vignette"]));

    assert_eq!(
        graph.node("txaa").unwrap().color_format,
        Some(TextureFormat::R32G32B32A32_SFLOAT)
    );
    assert_eq!(
        graph.node("tonemap").unwrap().color_format,
        Some(TextureFormat::R8G8B8A8_UNORM)
    );
    assert_eq!(
        graph.node("vignette").unwrap().color_format,
        Some(TextureFormat::R8G8B8A8_UNORM)
    );
    // Swapchain passes do not pin a format
    assert_eq!(graph.node("final_composite").unwrap().color_format, None);
}

#[test]
fn test_only_geometry_has_depth() {
    let graph = FrameGraph::standard(&post_config(&["txaa"], &[]));
    for node in graph.nodes() {
        if node.kind == PassKind::Geometry {
            assert_eq!(node.depth_format, Some(TextureFormat::D32_SFLOAT));
        } else {
            assert_eq!(node.depth_format, None);
        }
    }
}

#[test]
fn test_ui_overlay_finishes_in_present_layout() {
    let graph = FrameGraph::standard(&post_config(&[], &[]));
    let ui = graph.node("ui_overlay").unwrap();
    assert_eq!(ui.initial_layout, ImageLayout::ColorAttachment);
    assert_eq!(ui.final_layout, ImageLayout::PresentSrc);
}

// ============================================================================
// Tests: Idempotence (resize recreates the same description)
// ============================================================================

#[test]
fn test_standard_graph_is_deterministic() {
    let config = post_config(&["txaa", "bloom"], &["vignette", "grain"]);
    let first = FrameGraph::standard(&config);
    let second = FrameGraph::standard(&config);
    assert_eq!(first, second);
    assert_eq!(first.schedule(), second.schedule());
}

// ============================================================================
// Tests: Ping-pong schedule
// ============================================================================

#[test]
fn test_schedule_never_reads_written_target() {
    let graph = FrameGraph::standard(&post_config(&["a", "b", "c"], &["d", "e"]));
    for io in graph.schedule() {
        match (io.source, io.target) {
            (PassSource::HighRes(read), PassTarget::HighRes(write)) => assert_ne!(read, write),
            (PassSource::LowRes(read), PassTarget::LowRes(write)) => assert_ne!(read, write),
            _ => {}
        }
    }
}

#[test]
fn test_schedule_chains_consumers_to_producers() {
    let graph = FrameGraph::standard(&post_config(&["a", "b"], &["c"]));
    let schedule = graph.schedule();

    // compute_composite reads geometry, writes high 0
    assert_eq!(schedule[1].source, PassSource::GeometryColor);
    assert_eq!(schedule[1].target, PassTarget::HighRes(0));
    // "a" reads high 0, writes high 1
    assert_eq!(schedule[2].source, PassSource::HighRes(0));
    assert_eq!(schedule[2].target, PassTarget::HighRes(1));
    // "b" flips back
    assert_eq!(schedule[3].source, PassSource::HighRes(1));
    assert_eq!(schedule[3].target, PassTarget::HighRes(0));
    // tonemap reads the last written high-res target
    assert_eq!(schedule[4].source, PassSource::HighRes(0));
    assert_eq!(schedule[4].target, PassTarget::TonemapOutput);
    // "c" reads tonemap output, writes low 0
    assert_eq!(schedule[5].source, PassSource::TonemapOutput);
    assert_eq!(schedule[5].target, PassTarget::LowRes(0));
    // final composite reads the last written low-res target
    assert_eq!(schedule[6].source, PassSource::LowRes(0));
    assert_eq!(schedule[6].target, PassTarget::SwapchainImage);
}

#[test]
fn test_schedule_without_low_stages_composites_tonemap() {
    let graph = FrameGraph::standard(&post_config(&["a"], &[]));
    let schedule = graph.schedule();
    let composite = &schedule[schedule.len() - 2];
    assert_eq!(composite.source, PassSource::TonemapOutput);
    assert_eq!(composite.target, PassTarget::SwapchainImage);
}

// ============================================================================
// Tests: Validation failures
// ============================================================================

#[test]
fn test_validate_rejects_duplicate_stage_names() {
    let graph = FrameGraph::standard(&post_config(&["txaa", "txaa"], &[]));
    assert!(matches!(graph.validate(), Err(Error::Configuration(_))));
}

#[test]
fn test_validate_rejects_stage_named_like_builtin_pass() {
    let graph = FrameGraph::standard(&post_config(&["tonemap"], &[]));
    assert!(matches!(graph.validate(), Err(Error::Configuration(_))));
}

#[test]
fn test_validate_is_order_sensitive() {
    // Hand-build a graph with the tonemap before the high-res stages
    let reference = FrameGraph::standard(&post_config(&["txaa"], &[]));
    let mut nodes: Vec<PassNode> = reference.nodes().to_vec();
    nodes.swap(2, 3); // txaa <-> tonemap
    let broken = FrameGraph { nodes };
    assert!(matches!(broken.validate(), Err(Error::Configuration(_))));
}

#[test]
fn test_validate_rejects_low_precision_before_tonemap() {
    let reference = FrameGraph::standard(&post_config(&["txaa"], &[]));
    let mut nodes: Vec<PassNode> = reference.nodes().to_vec();
    nodes[2].color_format = Some(TextureFormat::R8G8B8A8_UNORM);
    let broken = FrameGraph { nodes };
    assert!(matches!(broken.validate(), Err(Error::Configuration(_))));
}

#[test]
fn test_validate_rejects_unsupported_layout_contract() {
    let reference = FrameGraph::standard(&post_config(&[], &[]));
    let mut nodes: Vec<PassNode> = reference.nodes().to_vec();
    // PresentSrc is not a valid source for a color-attachment write
    nodes[0].initial_layout = ImageLayout::PresentSrc;
    let broken = FrameGraph { nodes };
    assert!(matches!(broken.validate(), Err(Error::Configuration(_))));
}
