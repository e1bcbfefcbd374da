/*!
# Mage Framework

Core types for the Mage real-time rendering framework.

This crate provides the platform-agnostic half of the framework: error
taxonomy, logging, scene configuration, timing and jitter, camera math, and
the backend-agnostic descriptions of the frame pipeline (render-pass graph
and submission chain). Backend implementations (Vulkan) consume these
descriptions and realize them against the GPU.

## Architecture

- **error / log**: unified `Result`/`Error` with fatal vs. recoverable
  classification, and the framework logging macros
- **config**: JSON scene description loaded once at startup
- **render::graph**: the fixed render-pass sequence and its validation
- **render::submission**: the declared semaphore wait/signal chain
- **camera / timer / jitter**: per-frame CPU-side state feeding uniforms
*/

// Internal modules
mod error;
pub mod log;
pub mod config;
pub mod context;
pub mod timer;
pub mod jitter;
pub mod camera;
pub mod mesh;
pub mod render;

// Main mage namespace module
pub mod mage {
    // Error types
    pub use crate::error::{Error, ErrorKind, Result};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: mage_* macros are NOT re-exported here - they live at the crate root
    }

    // Render sub-module with the pipeline descriptions
    pub mod render {
        pub use crate::render::*;
    }

    // Configuration sub-module
    pub mod config {
        pub use crate::config::*;
    }

    // Scene-facing state
    pub use crate::camera::{Camera, CameraUniformBlock};
    pub use crate::context::AppContext;
    pub use crate::timer::Timer;
    pub use crate::jitter::{halton_sequence_at, JitterSequence, TimeUniformBlock};
    pub use crate::mesh::{Vertex, MeshData, TextureData, ModelUniformBlock};
}

// Re-export math library at crate root
pub use glam;
