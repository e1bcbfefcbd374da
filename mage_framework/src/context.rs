//! Application context
//!
//! All per-application state that the event-loop layer needs (timer, camera,
//! configuration, window extent) lives in one explicitly-owned struct that is
//! passed by reference into input callbacks. There are no process-wide
//! globals for any of this state.

use crate::camera::Camera;
use crate::config::SceneConfig;
use crate::timer::Timer;

/// Owned application state, constructed once at startup
#[derive(Debug)]
pub struct AppContext {
    /// Frame timer (owns its own epoch)
    pub timer: Timer,
    /// Scene camera
    pub camera: Camera,
    /// Read-only scene configuration
    pub config: SceneConfig,
    /// Current window extent in pixels
    window_extent: (u32, u32),
    /// Frames rendered since startup
    pub frame_counter: u64,
}

impl AppContext {
    /// Build the context from a loaded configuration and the initial extent
    pub fn new(config: SceneConfig, window_extent: (u32, u32)) -> Self {
        let aspect_ratio = aspect_ratio_of(window_extent);
        let camera = Camera::from_config(&config.camera, aspect_ratio);
        Self {
            timer: Timer::new(),
            camera,
            config,
            window_extent,
            frame_counter: 0,
        }
    }

    /// Record a new window extent; updates the camera aspect ratio when the
    /// window is not minimized
    pub fn set_window_extent(&mut self, width: u32, height: u32) {
        self.window_extent = (width, height);
        if !self.is_minimized() {
            self.camera.set_aspect_ratio(aspect_ratio_of(self.window_extent));
        }
    }

    /// Current window extent in pixels
    pub fn window_extent(&self) -> (u32, u32) {
        self.window_extent
    }

    /// True while either window dimension is zero.
    ///
    /// Rendering and swapchain recreation must not proceed until both
    /// dimensions are non-zero again; the event loop blocks on window events
    /// instead.
    pub fn is_minimized(&self) -> bool {
        self.window_extent.0 == 0 || self.window_extent.1 == 0
    }

    /// Advance the timer and frame counter; returns the frame delta in ms
    pub fn begin_frame(&mut self) -> f32 {
        self.timer.tick();
        self.frame_counter += 1;
        self.timer.frame_delta_ms()
    }
}

fn aspect_ratio_of(extent: (u32, u32)) -> f32 {
    if extent.1 == 0 {
        1.0
    } else {
        extent.0 as f32 / extent.1 as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, SceneConfig};

    fn test_config() -> SceneConfig {
        SceneConfig {
            camera: CameraConfig {
                position: [0.0, 0.0, 5.0],
                look_at: [0.0, 0.0, 0.0],
                up: [0.0, 1.0, 0.0],
                fov_y_degrees: 60.0,
                near: 0.1,
                far: 100.0,
            },
            models: Vec::new(),
            post_process: Default::default(),
            shader_dir: "shaders".into(),
        }
    }

    #[test]
    fn test_minimized_detection() {
        let mut ctx = AppContext::new(test_config(), (800, 600));
        assert!(!ctx.is_minimized());

        ctx.set_window_extent(0, 600);
        assert!(ctx.is_minimized());

        ctx.set_window_extent(800, 0);
        assert!(ctx.is_minimized());

        ctx.set_window_extent(800, 600);
        assert!(!ctx.is_minimized());
    }

    #[test]
    fn test_begin_frame_advances_counter() {
        let mut ctx = AppContext::new(test_config(), (800, 600));
        assert_eq!(ctx.frame_counter, 0);
        ctx.begin_frame();
        ctx.begin_frame();
        assert_eq!(ctx.frame_counter, 2);
    }

    #[test]
    fn test_resize_while_minimized_keeps_camera() {
        let mut ctx = AppContext::new(test_config(), (800, 600));
        let projection = *ctx.camera.projection_matrix();
        // Minimized resize must not poison the projection with a zero aspect
        ctx.set_window_extent(0, 0);
        assert_eq!(projection, *ctx.camera.projection_matrix());
    }
}
