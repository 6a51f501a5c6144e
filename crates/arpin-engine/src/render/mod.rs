//! The demo's three render passes.
//!
//! Every renderer follows the same shape: `initialize` creates its GPU
//! resources on the render thread once a surface exists, `render` issues
//! draw calls and returns how many objects it drew, and `release` deletes
//! what `initialize` created. A renderer that was never initialized (or was
//! released) draws nothing.
//!
//! - [`background`]: full-screen camera quad.
//! - [`plane`]: translucent fill per tracked plane.
//! - [`marker`]: wireframe cube per tracked anchor.

pub mod background;
pub mod marker;
pub mod plane;

pub use background::BackgroundRenderer;
pub use marker::MarkerRenderer;
pub use plane::PlaneRenderer;

use arpin_gfx::prelude::*;
use arpin_gfx::shaders;

/// A linked solid-color program with its resolved slots. Shared by the
/// plane and marker passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FlatProgram {
    pub program: ProgramId,
    pub position: AttribLocation,
    pub mvp: UniformLocation,
    pub color: UniformLocation,
}

impl FlatProgram {
    pub(crate) fn build<G: GlContext + ?Sized>(gl: &mut G) -> Result<Self, GfxError> {
        let program = build_program(gl, shaders::FLAT_VERTEX, shaders::FLAT_FRAGMENT)?;
        let resolved = Self::resolve(gl, program);
        if resolved.is_err() {
            gl.delete_program(program);
        }
        resolved
    }

    fn resolve<G: GlContext + ?Sized>(gl: &mut G, program: ProgramId) -> Result<Self, GfxError> {
        Ok(Self {
            program,
            position: require_attrib(gl, program, shaders::POSITION_ATTRIB)?,
            mvp: require_uniform(gl, program, shaders::MVP_UNIFORM)?,
            color: require_uniform(gl, program, shaders::COLOR_UNIFORM)?,
        })
    }

    pub(crate) fn release<G: GlContext + ?Sized>(self, gl: &mut G) {
        gl.delete_program(self.program);
    }
}
