//! The [`GlContext`] trait.
//!
//! A context is bound to the thread that created it. Every method is called
//! from the render thread only, so the trait deliberately does not require
//! `Send`.

use crate::{
    AttribLocation, BlendFactor, Capability, GfxError, Primitive, ProgramId, ShaderId,
    ShaderStage, TextureId, UniformLocation,
};

/// The subset of OpenGL ES 2.0 the demo's renderers use.
pub trait GlContext {
    /// Set the color used by [`clear`](Self::clear).
    fn clear_color(&mut self, rgba: [f32; 4]);

    /// Clear the color and/or depth buffers.
    fn clear(&mut self, color: bool, depth: bool);

    /// Set the viewport rectangle in pixels.
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);

    /// Allocate a texture for the external (`samplerExternalOES`) target
    /// with clamp-to-edge wrapping and nearest filtering.
    ///
    /// # Errors
    ///
    /// [`GfxError::Allocation`] if the driver refuses.
    fn create_external_texture(&mut self) -> Result<TextureId, GfxError>;

    /// Bind a texture to the external target.
    fn bind_external_texture(&mut self, texture: TextureId);

    /// Delete a texture.
    fn delete_texture(&mut self, texture: TextureId);

    /// Compile one shader stage.
    ///
    /// # Errors
    ///
    /// [`GfxError::ShaderCompile`] with the driver info log.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, GfxError>;

    /// Delete a shader object.
    fn delete_shader(&mut self, shader: ShaderId);

    /// Link a vertex and a fragment shader into a program.
    ///
    /// # Errors
    ///
    /// [`GfxError::ProgramLink`] with the driver info log.
    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, GfxError>;

    /// Delete a program object.
    fn delete_program(&mut self, program: ProgramId);

    /// Look up an active attribute.
    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<AttribLocation>;

    /// Look up an active uniform.
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Make a program current.
    fn use_program(&mut self, program: ProgramId);

    /// Point an attribute at tightly packed `f32` data with `components`
    /// floats per vertex.
    fn vertex_attrib_f32(&mut self, location: AttribLocation, components: u8, data: &[f32]);

    /// Enable an attribute array.
    fn enable_vertex_attrib(&mut self, location: AttribLocation);

    /// Disable an attribute array.
    fn disable_vertex_attrib(&mut self, location: AttribLocation);

    /// Upload a column-major 4x4 matrix uniform.
    fn uniform_mat4(&mut self, location: UniformLocation, matrix: &[f32; 16]);

    /// Upload a `vec4` uniform.
    fn uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]);

    /// Enable or disable a capability.
    fn set_capability(&mut self, capability: Capability, enabled: bool);

    /// Enable or disable depth buffer writes.
    fn depth_mask(&mut self, write: bool);

    /// Set the blend equation factors.
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);

    /// Draw `count` vertices starting at `first`.
    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32);

    /// Free the state the context allocated on its own behalf: attribute
    /// streaming buffers and cached vertex data. Textures, shaders and
    /// programs are untouched; their owners delete them.
    fn release_transient(&mut self);
}
