/// Tests for camera matrix computation

use super::*;
use crate::config::CameraConfig;

fn test_config() -> CameraConfig {
    CameraConfig {
        position: [0.0, 0.0, 5.0],
        look_at: [0.0, 0.0, 0.0],
        up: [0.0, 1.0, 0.0],
        fov_y_degrees: 60.0,
        near: 0.1,
        far: 100.0,
    }
}

#[test]
fn test_view_matrix_moves_eye_to_origin() {
    let camera = Camera::from_config(&test_config(), 16.0 / 9.0);
    let eye_in_view = camera.view_matrix().transform_point3(camera.position());
    assert!(eye_in_view.abs_diff_eq(Vec3::ZERO, 1e-5));
}

#[test]
fn test_look_at_target_is_in_front() {
    let camera = Camera::from_config(&test_config(), 16.0 / 9.0);
    // Right-handed view space looks down -z
    let target_in_view = camera.view_matrix().transform_point3(Vec3::ZERO);
    assert!(target_in_view.z < 0.0);
}

#[test]
fn test_projection_flips_y_for_vulkan() {
    let camera = Camera::from_config(&test_config(), 1.0);
    assert!(camera.projection_matrix().y_axis.y < 0.0);
}

#[test]
fn test_set_aspect_ratio_changes_projection() {
    let mut camera = Camera::from_config(&test_config(), 1.0);
    let before = *camera.projection_matrix();
    camera.set_aspect_ratio(2.0);
    assert_ne!(before, *camera.projection_matrix());
}

#[test]
fn test_uniform_block_carries_eye_position() {
    let camera = Camera::from_config(&test_config(), 1.0);
    let block = camera.uniform_block();
    assert_eq!(block.eye, Vec4::new(0.0, 0.0, 5.0, 1.0));
    assert_eq!(block.view, *camera.view_matrix());
    assert_eq!(block.projection, *camera.projection_matrix());
}

#[test]
fn test_uniform_block_is_pod() {
    let camera = Camera::from_config(&test_config(), 1.0);
    let block = camera.uniform_block();
    let bytes: &[u8] = bytemuck::bytes_of(&block);
    assert_eq!(bytes.len(), std::mem::size_of::<CameraUniformBlock>());
}
