/// Tests for the scene configuration schema

use super::*;

fn minimal_json() -> &'static str {
    r#"{
        "camera": {
            "position": [2.0, 2.0, 2.0],
            "look_at": [0.0, 0.0, 0.0]
        }
    }"#
}

fn full_json() -> &'static str {
    r#"{
        "camera": {
            "position": [2.5, 2.0, 2.5],
            "look_at": [0.0, 0.5, 0.0],
            "up": [0.0, 1.0, 0.0],
            "fov_y_degrees": 45.0,
            "near": 0.5,
            "far": 200.0
        },
        "models": [
            {
                "name": "house",
                "mesh": "builtin:cube",
                "texture": "builtin:checker",
                "transform": {
                    "translation": [0.0, 1.0, 0.0],
                    "rotation_degrees": [0.0, 90.0, 0.0],
                    "scale": [2.0, 2.0, 2.0]
                }
            }
        ],
        "post_process": {
            "high_res_stages": ["txaa"],
            "low_res_stages": ["vignette"]
        },
        "shader_dir": "assets/shaders"
    }"#
}

// ============================================================================
// Tests: Parsing
// ============================================================================

#[test]
fn test_minimal_config_uses_defaults() {
    let config = SceneConfig::from_json(minimal_json()).unwrap();

    assert_eq!(config.camera.up, [0.0, 1.0, 0.0]);
    assert_eq!(config.camera.fov_y_degrees, 60.0);
    assert!(config.models.is_empty());
    assert!(config.post_process.high_res_stages.is_empty());
    assert!(config.post_process.low_res_stages.is_empty());
    assert_eq!(config.shader_dir, std::path::PathBuf::from("shaders"));
}

#[test]
fn test_full_config_parses() {
    let config = SceneConfig::from_json(full_json()).unwrap();

    assert_eq!(config.camera.fov_y_degrees, 45.0);
    assert_eq!(config.models.len(), 1);
    assert_eq!(config.models[0].name, "house");
    assert_eq!(config.post_process.high_res_stages, vec!["txaa".to_string()]);
    assert_eq!(config.post_process.low_res_stages, vec!["vignette".to_string()]);
}

#[test]
fn test_missing_camera_is_configuration_error() {
    let result = SceneConfig::from_json(r#"{ "models": [] }"#);
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_malformed_json_is_configuration_error() {
    let result = SceneConfig::from_json("{ not json");
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_load_from_missing_path_is_io_error() {
    let result = SceneConfig::load_from_path(std::path::Path::new("/nonexistent/scene.json"));
    assert!(matches!(result, Err(Error::Io(_))));
}

// ============================================================================
// Tests: Transform composition
// ============================================================================

#[test]
fn test_default_transform_is_identity() {
    let transform = TransformConfig::default();
    let matrix = transform.to_matrix();
    assert!(matrix.abs_diff_eq(glam::Mat4::IDENTITY, 1e-6));
}

#[test]
fn test_transform_translation() {
    let transform = TransformConfig {
        translation: [1.0, 2.0, 3.0],
        ..Default::default()
    };
    let matrix = transform.to_matrix();
    let origin = matrix.transform_point3(glam::Vec3::ZERO);
    assert!(origin.abs_diff_eq(glam::Vec3::new(1.0, 2.0, 3.0), 1e-6));
}

#[test]
fn test_transform_scale_applies_before_translation() {
    let transform = TransformConfig {
        translation: [10.0, 0.0, 0.0],
        scale: [2.0, 2.0, 2.0],
        ..Default::default()
    };
    let matrix = transform.to_matrix();
    let point = matrix.transform_point3(glam::Vec3::new(1.0, 0.0, 0.0));
    assert!(point.abs_diff_eq(glam::Vec3::new(12.0, 0.0, 0.0), 1e-6));
}
