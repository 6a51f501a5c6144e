//! OpenGL ES 2.0 backend over `glow`.
//!
//! GL object names are kept in handle tables and exposed as the crate's
//! small integer handles, so renderers never see a `glow` type. Client-side
//! vertex data is streamed through one `ARRAY_BUFFER` per attribute
//! location, re-uploaded on every `vertex_attrib_f32` call, and freed by
//! `release_transient`. Uniform handles belong to their program and are
//! dropped with it.

use std::collections::HashMap;

use glow::HasContext;

use crate::context::GlContext;
use crate::{
    AttribLocation, BlendFactor, Capability, GfxError, Primitive, ProgramId, ShaderId,
    ShaderStage, TextureId, UniformLocation,
};

/// `GL_TEXTURE_EXTERNAL_OES` from `OES_EGL_image_external`.
pub const TEXTURE_EXTERNAL_OES: u32 = 0x8D65;

type NativeTexture = <glow::Context as HasContext>::Texture;
type NativeShader = <glow::Context as HasContext>::Shader;
type NativeProgram = <glow::Context as HasContext>::Program;
type NativeBuffer = <glow::Context as HasContext>::Buffer;
type NativeUniform = <glow::Context as HasContext>::UniformLocation;

/// Slot table mapping small integer handles to native GL objects.
///
/// Slot 0 is never handed out so a zero handle is always invalid.
#[derive(Debug)]
struct Table<T> {
    slots: Vec<Option<T>>,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self { slots: vec![None] }
    }

    fn insert(&mut self, value: T) -> u32 {
        if let Some(index) = self.slots.iter().skip(1).position(Option::is_none) {
            self.slots[index + 1] = Some(value);
            return (index + 1) as u32;
        }
        self.slots.push(Some(value));
        (self.slots.len() - 1) as u32
    }

    fn get(&self, handle: u32) -> Option<&T> {
        self.slots.get(handle as usize).and_then(Option::as_ref)
    }

    fn remove(&mut self, handle: u32) -> Option<T> {
        self.slots.get_mut(handle as usize).and_then(Option::take)
    }

    fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        for slot in self.slots.iter_mut().skip(1) {
            if slot.as_ref().is_some_and(|value| !keep(value)) {
                *slot = None;
            }
        }
    }
}

/// A [`GlContext`] backed by a live OpenGL ES 2.0 context.
pub struct GlesContext {
    gl: glow::Context,
    textures: Table<NativeTexture>,
    shaders: Table<NativeShader>,
    programs: Table<NativeProgram>,
    /// Uniform locations tagged with the program handle they came from.
    uniforms: Table<(u32, NativeUniform)>,
    uniform_names: HashMap<(u32, String), u32>,
    attrib_buffers: HashMap<u32, NativeBuffer>,
}

impl GlesContext {
    /// Wrap a `glow` context that is current on the calling thread.
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            textures: Table::new(),
            shaders: Table::new(),
            programs: Table::new(),
            uniforms: Table::new(),
            uniform_names: HashMap::new(),
            attrib_buffers: HashMap::new(),
        }
    }

    /// The underlying `glow` context.
    pub fn raw(&self) -> &glow::Context {
        &self.gl
    }
}

fn primitive_mode(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::TriangleStrip => glow::TRIANGLE_STRIP,
        Primitive::TriangleFan => glow::TRIANGLE_FAN,
        Primitive::LineLoop => glow::LINE_LOOP,
    }
}

fn capability_enum(capability: Capability) -> u32 {
    match capability {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::Blend => glow::BLEND,
    }
}

fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
    }
}

impl GlContext for GlesContext {
    fn clear_color(&mut self, rgba: [f32; 4]) {
        unsafe { self.gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]) };
    }

    fn clear(&mut self, color: bool, depth: bool) {
        let mut mask = 0;
        if color {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if depth {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        unsafe { self.gl.clear(mask) };
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) };
    }

    fn create_external_texture(&mut self) -> Result<TextureId, GfxError> {
        let texture = unsafe {
            let texture = self.gl.create_texture().map_err(GfxError::Allocation)?;
            self.gl.bind_texture(TEXTURE_EXTERNAL_OES, Some(texture));
            let params = [
                (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
                (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
                (glow::TEXTURE_MIN_FILTER, glow::NEAREST),
                (glow::TEXTURE_MAG_FILTER, glow::NEAREST),
            ];
            for (name, value) in params {
                self.gl
                    .tex_parameter_i32(TEXTURE_EXTERNAL_OES, name, value as i32);
            }
            texture
        };
        Ok(TextureId(self.textures.insert(texture)))
    }

    fn bind_external_texture(&mut self, texture: TextureId) {
        let native = self.textures.get(texture.0).copied();
        unsafe { self.gl.bind_texture(TEXTURE_EXTERNAL_OES, native) };
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if let Some(native) = self.textures.remove(texture.0) {
            unsafe { self.gl.delete_texture(native) };
        }
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, GfxError> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        let shader = unsafe {
            let shader = self
                .gl
                .create_shader(kind)
                .map_err(|log| GfxError::ShaderCompile { stage, log })?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(GfxError::ShaderCompile { stage, log });
            }
            shader
        };
        Ok(ShaderId(self.shaders.insert(shader)))
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if let Some(native) = self.shaders.remove(shader.0) {
            unsafe { self.gl.delete_shader(native) };
        }
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, GfxError> {
        let (Some(&vs), Some(&fs)) = (self.shaders.get(vertex.0), self.shaders.get(fragment.0))
        else {
            return Err(GfxError::ProgramLink {
                log: "attached shader does not exist".to_owned(),
            });
        };
        let program = unsafe {
            let program = self
                .gl
                .create_program()
                .map_err(|log| GfxError::ProgramLink { log })?;
            self.gl.attach_shader(program, vs);
            self.gl.attach_shader(program, fs);
            self.gl.link_program(program);
            self.gl.detach_shader(program, vs);
            self.gl.detach_shader(program, fs);
            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(GfxError::ProgramLink { log });
            }
            program
        };
        Ok(ProgramId(self.programs.insert(program)))
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(native) = self.programs.remove(program.0) {
            unsafe { self.gl.delete_program(native) };
        }
        self.uniforms.retain(|(owner, _)| *owner != program.0);
        self.uniform_names.retain(|(owner, _), _| *owner != program.0);
    }

    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        let native = *self.programs.get(program.0)?;
        unsafe { self.gl.get_attrib_location(native, name) }.map(AttribLocation)
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let key = (program.0, name.to_owned());
        if let Some(&handle) = self.uniform_names.get(&key) {
            return Some(UniformLocation(handle));
        }
        let native = *self.programs.get(program.0)?;
        let location = unsafe { self.gl.get_uniform_location(native, name) }?;
        let handle = self.uniforms.insert((program.0, location));
        self.uniform_names.insert(key, handle);
        Some(UniformLocation(handle))
    }

    fn use_program(&mut self, program: ProgramId) {
        let native = self.programs.get(program.0).copied();
        unsafe { self.gl.use_program(native) };
    }

    fn vertex_attrib_f32(&mut self, location: AttribLocation, components: u8, data: &[f32]) {
        let buffer = match self.attrib_buffers.get(&location.0) {
            Some(buffer) => *buffer,
            None => match unsafe { self.gl.create_buffer() } {
                Ok(buffer) => {
                    self.attrib_buffers.insert(location.0, buffer);
                    buffer
                }
                Err(log) => {
                    tracing::error!(location = location.0, %log, "vertex buffer allocation failed");
                    return;
                }
            },
        };
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STREAM_DRAW,
            );
            self.gl.vertex_attrib_pointer_f32(
                location.0,
                i32::from(components),
                glow::FLOAT,
                false,
                0,
                0,
            );
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn enable_vertex_attrib(&mut self, location: AttribLocation) {
        unsafe { self.gl.enable_vertex_attrib_array(location.0) };
    }

    fn disable_vertex_attrib(&mut self, location: AttribLocation) {
        unsafe { self.gl.disable_vertex_attrib_array(location.0) };
    }

    fn uniform_mat4(&mut self, location: UniformLocation, matrix: &[f32; 16]) {
        let native = self.uniforms.get(location.0).map(|(_, native)| native);
        unsafe { self.gl.uniform_matrix_4_f32_slice(native, false, matrix) };
    }

    fn uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]) {
        let native = self.uniforms.get(location.0).map(|(_, native)| native);
        unsafe {
            self.gl
                .uniform_4_f32(native, value[0], value[1], value[2], value[3])
        };
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        let cap = capability_enum(capability);
        unsafe {
            if enabled {
                self.gl.enable(cap);
            } else {
                self.gl.disable(cap);
            }
        }
    }

    fn depth_mask(&mut self, write: bool) {
        unsafe { self.gl.depth_mask(write) };
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        unsafe { self.gl.blend_func(blend_factor(src), blend_factor(dst)) };
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        unsafe {
            self.gl
                .draw_arrays(primitive_mode(primitive), first as i32, count as i32)
        };
    }

    fn release_transient(&mut self) {
        let count = self.attrib_buffers.len();
        for (_, buffer) in self.attrib_buffers.drain() {
            unsafe { self.gl.delete_buffer(buffer) };
        }
        tracing::debug!(buffers = count, "attribute buffers released");
    }
}
