//! Shader program construction.
//!
//! [`build_program`] compiles a vertex/fragment pair and links them,
//! cleaning up whatever was created when a step fails. Shader objects are
//! deleted after a successful link; the program keeps them alive for as
//! long as it needs them.

use crate::context::GlContext;
use crate::{AttribLocation, GfxError, ProgramId, ShaderStage, UniformLocation};

/// Compile and link a program from GLSL ES sources.
///
/// # Errors
///
/// [`GfxError::ShaderCompile`] or [`GfxError::ProgramLink`]. No shader or
/// program objects are leaked on failure.
pub fn build_program<G: GlContext + ?Sized>(
    gl: &mut G,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<ProgramId, GfxError> {
    let vertex = gl.compile_shader(ShaderStage::Vertex, vertex_source)?;
    let fragment = match gl.compile_shader(ShaderStage::Fragment, fragment_source) {
        Ok(shader) => shader,
        Err(e) => {
            gl.delete_shader(vertex);
            return Err(e);
        }
    };

    let linked = gl.link_program(vertex, fragment);
    gl.delete_shader(vertex);
    gl.delete_shader(fragment);

    let program = linked?;
    tracing::debug!(program = program.0, "shader program linked");
    Ok(program)
}

/// Look up an attribute that the program must have.
///
/// # Errors
///
/// [`GfxError::MissingAttribute`] if the attribute is not active.
pub fn require_attrib<G: GlContext + ?Sized>(
    gl: &mut G,
    program: ProgramId,
    name: &str,
) -> Result<AttribLocation, GfxError> {
    gl.attrib_location(program, name)
        .ok_or_else(|| GfxError::MissingAttribute {
            name: name.to_owned(),
        })
}

/// Look up a uniform that the program must have.
///
/// # Errors
///
/// [`GfxError::MissingUniform`] if the uniform is not active.
pub fn require_uniform<G: GlContext + ?Sized>(
    gl: &mut G,
    program: ProgramId,
    name: &str,
) -> Result<UniformLocation, GfxError> {
    gl.uniform_location(program, name)
        .ok_or_else(|| GfxError::MissingUniform {
            name: name.to_owned(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
