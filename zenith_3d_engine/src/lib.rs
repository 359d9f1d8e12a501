/*!
# Zenith 3D Engine

Deferred real-time renderer core.

The engine consumes an abstract graphics device (`GraphicsDevice`) and a
caller-owned scene graph. Every frame it mirrors scene changes into
fixed-capacity GPU arrays, regenerates the sky environment when needed,
renders exponential shadow maps, fills a G-buffer through indirect
draws, lights it, and composes the result into a caller-provided image.

## Architecture

- **RenderEngine**: explicit per-frame orchestrator owning all GPU state
- **Scene**: arena of nodes, lights, model instances, terrain and water
- **SceneSynchronizer**: dirty tracking and slot pools feeding GPU arrays
- **StagedUploader**: one staging buffer, one flush per frame
- **IndirectDrawTable**: slot-ordered indirect draw commands
- **passes**: environment, shadow, geometry, lighting and compose

Backends implement the `graphics_device` traits; `graphics_device::mock`
records commands for headless use.
*/

// Internal modules
mod error;
mod render_engine;
pub mod log;
pub mod config;
pub mod utils;
pub mod graphics_device;
pub mod camera;
pub mod scene;
pub mod sync;
pub mod draw;
pub mod passes;

// Main zenith3d namespace module
pub mod zenith3d {
    // Error types
    pub use crate::error::{Zenith3dError, Zenith3dResult, Error, Result};

    // Configuration
    pub use crate::config::{EngineConfig, Capacities, MAX_TAGGED_INSTANCES};

    // Frame orchestrator
    pub use crate::render_engine::{RenderEngine, FrameStats};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger,
            set_logger, reset_logger, set_min_severity, min_severity,
        };
    }

    // Device abstraction
    pub mod device {
        pub use crate::graphics_device::*;
    }

    pub mod camera {
        pub use crate::camera::*;
    }

    pub mod scene {
        pub use crate::scene::*;
    }

    pub mod sync {
        pub use crate::sync::*;
    }

    pub mod draw {
        pub use crate::draw::*;
    }

    pub mod passes {
        pub use crate::passes::*;
    }
}

// Re-export math library at crate root
pub use glam;
