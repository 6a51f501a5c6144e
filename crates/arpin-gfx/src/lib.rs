//! arpin gfx -- the graphics-context seam between the renderers and GL.
//!
//! Renderers never call GL directly. They talk to a [`GlContext`], which
//! exposes exactly the primitives the demo needs: shader compile/link,
//! attribute and uniform lookup, one external-sampler texture kind,
//! client-side vertex attributes, a few capability toggles, and
//! `draw_arrays` for triangle strips, triangle fans and line loops.
//!
//! Two implementations ship with the crate:
//!
//! - [`RecordingContext`](recording::RecordingContext): a headless context
//!   that logs every call and tracks GL state, used by tests and the
//!   headless example.
//! - `GlesContext` (feature `renderer`): a `glow`-backed OpenGL ES 2.0
//!   context for on-device rendering.
//!
//! # Quick Start
//!
//! ```
//! use arpin_gfx::prelude::*;
//! use arpin_gfx::recording::RecordingContext;
//!
//! let mut gl = RecordingContext::new();
//! let program = build_program(
//!     &mut gl,
//!     "attribute vec4 a_Position;\nvoid main() { gl_Position = a_Position; }",
//!     "precision mediump float;\nuniform vec4 u_Color;\nvoid main() { gl_FragColor = u_Color; }",
//! )
//! .unwrap();
//! assert!(gl.attrib_location(program, "a_Position").is_some());
//! ```

#![deny(unsafe_code)]

pub mod context;
#[cfg(feature = "renderer")]
#[allow(unsafe_code)]
pub mod gles;
pub mod program;
pub mod recording;
pub mod shaders;

use serde::{Deserialize, Serialize};

pub use context::GlContext;

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// A texture owned by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureId(pub u32);

impl TextureId {
    /// The GL texture name handed to the AR runtime for camera streaming.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A compiled shader object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShaderId(pub u32);

/// A linked program object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramId(pub u32);

/// A vertex attribute slot within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttribLocation(pub u32);

/// A uniform slot within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UniformLocation(pub u32);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

/// Primitive topology for `draw_arrays`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    /// `GL_TRIANGLE_STRIP`
    TriangleStrip,
    /// `GL_TRIANGLE_FAN`
    TriangleFan,
    /// `GL_LINE_LOOP`
    LineLoop,
}

/// Server-side capabilities the renderers toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// `GL_DEPTH_TEST`
    DepthTest,
    /// `GL_BLEND`
    Blend,
}

/// Blend factors used by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    /// `GL_ONE`
    One,
    /// `GL_SRC_ALPHA`
    SrcAlpha,
    /// `GL_ONE_MINUS_SRC_ALPHA`
    OneMinusSrcAlpha,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while creating GPU resources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GfxError {
    /// A shader failed to compile.
    #[error("{stage:?} shader failed to compile: {log}")]
    ShaderCompile {
        /// Which stage failed.
        stage: ShaderStage,
        /// The driver's info log.
        log: String,
    },

    /// A program failed to link.
    #[error("program failed to link: {log}")]
    ProgramLink {
        /// The driver's info log.
        log: String,
    },

    /// A linked program has no active attribute with this name.
    #[error("program has no attribute named '{name}'")]
    MissingAttribute {
        /// Attribute name.
        name: String,
    },

    /// A linked program has no active uniform with this name.
    #[error("program has no uniform named '{name}'")]
    MissingUniform {
        /// Uniform name.
        name: String,
    },

    /// The driver refused to allocate an object.
    #[error("GPU resource allocation failed: {0}")]
    Allocation(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::context::GlContext;
    pub use crate::program::{build_program, require_attrib, require_uniform};
    pub use crate::{
        AttribLocation, BlendFactor, Capability, GfxError, Primitive, ProgramId, ShaderId,
        ShaderStage, TextureId, UniformLocation,
    };
}
