//! A headless [`GlContext`] that records every call.
//!
//! [`RecordingContext`] behaves like a minimal GL state machine: it hands
//! out object names, tracks which capabilities are enabled, which program is
//! current and what data each attribute points at, and snapshots all of that
//! into a [`DrawRecord`] whenever `draw_arrays` is called. Attribute and
//! uniform lookups are answered from the `attribute` / `uniform`
//! declarations in the shader sources, so a misspelled name fails here the
//! same way it would on a device.
//!
//! Failures can be injected for shader compilation, program linking and
//! texture allocation.
//!
//! The full call log is serializable and [`digest`](RecordingContext::digest)
//! returns its BLAKE3 hex digest, which makes "same inputs, same GL stream"
//! checks a one-line comparison.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::context::GlContext;
use crate::{
    AttribLocation, BlendFactor, Capability, GfxError, Primitive, ProgramId, ShaderId,
    ShaderStage, TextureId, UniformLocation,
};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One call made through the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GlCall {
    ClearColor([f32; 4]),
    Clear { color: bool, depth: bool },
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    CreateExternalTexture(TextureId),
    BindExternalTexture(TextureId),
    DeleteTexture(TextureId),
    CompileShader { stage: ShaderStage, shader: ShaderId },
    DeleteShader(ShaderId),
    LinkProgram { program: ProgramId, vertex: ShaderId, fragment: ShaderId },
    DeleteProgram(ProgramId),
    UseProgram(ProgramId),
    VertexAttrib { location: AttribLocation, components: u8, data: Vec<f32> },
    EnableVertexAttrib(AttribLocation),
    DisableVertexAttrib(AttribLocation),
    UniformMat4 { location: UniformLocation, matrix: [f32; 16] },
    UniformVec4 { location: UniformLocation, value: [f32; 4] },
    SetCapability { capability: Capability, enabled: bool },
    DepthMask(bool),
    BlendFunc { src: BlendFactor, dst: BlendFactor },
    DrawArrays { primitive: Primitive, first: u32, count: u32 },
    ReleaseTransient,
}

/// A uniform value as last uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UniformValue {
    Mat4([f32; 16]),
    Vec4([f32; 4]),
}

/// GL state captured at a `draw_arrays` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub primitive: Primitive,
    pub first: u32,
    pub count: u32,
    pub program: Option<ProgramId>,
    pub texture: Option<TextureId>,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: bool,
    /// Data of every enabled attribute, keyed by location.
    pub attribs: BTreeMap<AttribLocation, Vec<f32>>,
    /// Uniform values of the current program, keyed by location.
    pub uniforms: BTreeMap<UniformLocation, UniformValue>,
}

impl DrawRecord {
    /// The `vec4` uniform at `location`, if one was set.
    pub fn vec4(&self, location: UniformLocation) -> Option<[f32; 4]> {
        match self.uniforms.get(&location) {
            Some(UniformValue::Vec4(v)) => Some(*v),
            _ => None,
        }
    }

    /// The `mat4` uniform at `location`, if one was set.
    pub fn mat4(&self, location: UniformLocation) -> Option<[f32; 16]> {
        match self.uniforms.get(&location) {
            Some(UniformValue::Mat4(m)) => Some(*m),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Object bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ShaderInfo {
    stage: ShaderStage,
    attributes: Vec<String>,
    uniforms: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct ProgramInfo {
    attributes: Vec<String>,
    uniforms: Vec<String>,
}

/// Names declared with `keyword` (`attribute` or `uniform`) in GLSL source.
fn declared_names(source: &str, keyword: &str) -> Vec<String> {
    source
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(keyword))
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .filter_map(|rest| rest.split(';').next())
        .filter_map(|decl| decl.split_whitespace().last())
        .map(|name| name.split('[').next().unwrap_or(name).to_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// RecordingContext
// ---------------------------------------------------------------------------

/// Headless, call-recording [`GlContext`].
#[derive(Debug)]
pub struct RecordingContext {
    calls: Vec<GlCall>,
    draws: Vec<DrawRecord>,
    next_name: u32,
    textures: BTreeSet<TextureId>,
    shaders: BTreeMap<ShaderId, ShaderInfo>,
    programs: BTreeMap<ProgramId, ProgramInfo>,
    capabilities: BTreeSet<Capability>,
    depth_write: bool,
    current_program: Option<ProgramId>,
    bound_texture: Option<TextureId>,
    attrib_data: BTreeMap<AttribLocation, Vec<f32>>,
    enabled_attribs: BTreeSet<AttribLocation>,
    uniform_values: BTreeMap<(ProgramId, UniformLocation), UniformValue>,
    fail_compile_pattern: Option<String>,
    fail_link_log: Option<String>,
    fail_texture: bool,
}

impl RecordingContext {
    /// A fresh context with GL's default state: no capabilities enabled,
    /// depth writes on.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            draws: Vec::new(),
            next_name: 1,
            textures: BTreeSet::new(),
            shaders: BTreeMap::new(),
            programs: BTreeMap::new(),
            capabilities: BTreeSet::new(),
            depth_write: true,
            current_program: None,
            bound_texture: None,
            attrib_data: BTreeMap::new(),
            enabled_attribs: BTreeSet::new(),
            uniform_values: BTreeMap::new(),
            fail_compile_pattern: None,
            fail_link_log: None,
            fail_texture: false,
        }
    }

    // -- failure injection --------------------------------------------------

    /// Fail every compile whose source contains `pattern`.
    pub fn fail_compile_containing(&mut self, pattern: &str) {
        self.fail_compile_pattern = Some(pattern.to_owned());
    }

    /// Fail the next link with `log`.
    pub fn fail_next_link(&mut self, log: &str) {
        self.fail_link_log = Some(log.to_owned());
    }

    /// Fail every texture allocation.
    pub fn fail_texture_allocation(&mut self, fail: bool) {
        self.fail_texture = fail;
    }

    // -- inspection ---------------------------------------------------------

    /// Every call made so far.
    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    /// Every draw made so far.
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Draws using `primitive`.
    pub fn draws_of(&self, primitive: Primitive) -> Vec<&DrawRecord> {
        self.draws.iter().filter(|d| d.primitive == primitive).collect()
    }

    /// Forget recorded calls and draws. GL state and live objects are kept.
    pub fn clear_log(&mut self) {
        self.calls.clear();
        self.draws.clear();
    }

    /// BLAKE3 hex digest of the serialized call log.
    pub fn digest(&self) -> String {
        let json_bytes =
            serde_json::to_vec(&self.calls).expect("GL call log should always be JSON-serializable");
        blake3::hash(&json_bytes).to_hex().to_string()
    }

    /// Whether a capability is currently enabled.
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether depth writes are currently on.
    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    /// The program made current last.
    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    /// Textures not yet deleted.
    pub fn live_textures(&self) -> Vec<TextureId> {
        self.textures.iter().copied().collect()
    }

    /// Shaders not yet deleted.
    pub fn live_shaders(&self) -> Vec<ShaderId> {
        self.shaders.keys().copied().collect()
    }

    /// Programs not yet deleted.
    pub fn live_programs(&self) -> Vec<ProgramId> {
        self.programs.keys().copied().collect()
    }

    /// Attribute locations that still hold streamed vertex data.
    pub fn live_vertex_streams(&self) -> Vec<AttribLocation> {
        self.attrib_data.keys().copied().collect()
    }

    /// Uniform values still held for some program.
    pub fn live_uniform_values(&self) -> usize {
        self.uniform_values.len()
    }

    fn next_name(&mut self) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl GlContext for RecordingContext {
    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.calls.push(GlCall::ClearColor(rgba));
    }

    fn clear(&mut self, color: bool, depth: bool) {
        self.calls.push(GlCall::Clear { color, depth });
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.calls.push(GlCall::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn create_external_texture(&mut self) -> Result<TextureId, GfxError> {
        if self.fail_texture {
            return Err(GfxError::Allocation("texture allocation disabled".to_owned()));
        }
        let texture = TextureId(self.next_name());
        self.textures.insert(texture);
        self.calls.push(GlCall::CreateExternalTexture(texture));
        Ok(texture)
    }

    fn bind_external_texture(&mut self, texture: TextureId) {
        self.bound_texture = Some(texture);
        self.calls.push(GlCall::BindExternalTexture(texture));
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        if self.bound_texture == Some(texture) {
            self.bound_texture = None;
        }
        self.calls.push(GlCall::DeleteTexture(texture));
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderId, GfxError> {
        if let Some(pattern) = &self.fail_compile_pattern {
            if source.contains(pattern.as_str()) {
                return Err(GfxError::ShaderCompile {
                    stage,
                    log: format!("injected failure on '{pattern}'"),
                });
            }
        }
        let shader = ShaderId(self.next_name());
        self.shaders.insert(
            shader,
            ShaderInfo {
                stage,
                attributes: declared_names(source, "attribute"),
                uniforms: declared_names(source, "uniform"),
            },
        );
        self.calls.push(GlCall::CompileShader { stage, shader });
        Ok(shader)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
        self.calls.push(GlCall::DeleteShader(shader));
    }

    fn link_program(&mut self, vertex: ShaderId, fragment: ShaderId) -> Result<ProgramId, GfxError> {
        if let Some(log) = self.fail_link_log.take() {
            return Err(GfxError::ProgramLink { log });
        }
        let (Some(vs), Some(fs)) = (self.shaders.get(&vertex), self.shaders.get(&fragment)) else {
            return Err(GfxError::ProgramLink {
                log: "attached shader does not exist".to_owned(),
            });
        };
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err(GfxError::ProgramLink {
                log: "shader stages do not match their attachment points".to_owned(),
            });
        }
        let mut info = ProgramInfo {
            attributes: vs.attributes.clone(),
            uniforms: vs.uniforms.clone(),
        };
        for name in &fs.uniforms {
            if !info.uniforms.contains(name) {
                info.uniforms.push(name.clone());
            }
        }
        let program = ProgramId(self.next_name());
        self.programs.insert(program, info);
        self.calls.push(GlCall::LinkProgram {
            program,
            vertex,
            fragment,
        });
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.uniform_values.retain(|(p, _), _| *p != program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.calls.push(GlCall::DeleteProgram(program));
    }

    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        let info = self.programs.get(&program)?;
        info.attributes
            .iter()
            .position(|a| a == name)
            .map(|i| AttribLocation(i as u32))
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let info = self.programs.get(&program)?;
        info.uniforms
            .iter()
            .position(|u| u == name)
            .map(|i| UniformLocation(i as u32))
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current_program = Some(program);
        self.calls.push(GlCall::UseProgram(program));
    }

    fn vertex_attrib_f32(&mut self, location: AttribLocation, components: u8, data: &[f32]) {
        self.attrib_data.insert(location, data.to_vec());
        self.calls.push(GlCall::VertexAttrib {
            location,
            components,
            data: data.to_vec(),
        });
    }

    fn enable_vertex_attrib(&mut self, location: AttribLocation) {
        self.enabled_attribs.insert(location);
        self.calls.push(GlCall::EnableVertexAttrib(location));
    }

    fn disable_vertex_attrib(&mut self, location: AttribLocation) {
        self.enabled_attribs.remove(&location);
        self.calls.push(GlCall::DisableVertexAttrib(location));
    }

    fn uniform_mat4(&mut self, location: UniformLocation, matrix: &[f32; 16]) {
        if let Some(program) = self.current_program {
            self.uniform_values
                .insert((program, location), UniformValue::Mat4(*matrix));
        }
        self.calls.push(GlCall::UniformMat4 {
            location,
            matrix: *matrix,
        });
    }

    fn uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]) {
        if let Some(program) = self.current_program {
            self.uniform_values
                .insert((program, location), UniformValue::Vec4(value));
        }
        self.calls.push(GlCall::UniformVec4 { location, value });
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.capabilities.insert(capability);
        } else {
            self.capabilities.remove(&capability);
        }
        self.calls.push(GlCall::SetCapability {
            capability,
            enabled,
        });
    }

    fn depth_mask(&mut self, write: bool) {
        self.depth_write = write;
        self.calls.push(GlCall::DepthMask(write));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.calls.push(GlCall::BlendFunc { src, dst });
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        let attribs = self
            .enabled_attribs
            .iter()
            .map(|loc| (*loc, self.attrib_data.get(loc).cloned().unwrap_or_default()))
            .collect();
        let uniforms = match self.current_program {
            Some(program) => self
                .uniform_values
                .iter()
                .filter(|((p, _), _)| *p == program)
                .map(|((_, loc), value)| (*loc, *value))
                .collect(),
            None => BTreeMap::new(),
        };
        self.draws.push(DrawRecord {
            primitive,
            first,
            count,
            program: self.current_program,
            texture: self.bound_texture,
            depth_test: self.is_enabled(Capability::DepthTest),
            depth_write: self.depth_write,
            blend: self.is_enabled(Capability::Blend),
            attribs,
            uniforms,
        });
        self.calls.push(GlCall::DrawArrays {
            primitive,
            first,
            count,
        });
    }

    fn release_transient(&mut self) {
        self.attrib_data.clear();
        self.enabled_attribs.clear();
        self.calls.push(GlCall::ReleaseTransient);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::build_program;

    const VS: &str = "attribute vec4 a_Position;\nattribute vec2 a_TexCoord;\nvarying vec2 v_TexCoord;\nvoid main() { gl_Position = a_Position; }";
    const FS: &str = "precision mediump float;\nuniform vec4 u_Color;\nuniform mat4 u_Bones[4];\nvoid main() { gl_FragColor = u_Color; }";

    #[test]
    fn declared_names_parse_attributes_and_uniform_arrays() {
        assert_eq!(declared_names(VS, "attribute"), vec!["a_Position", "a_TexCoord"]);
        assert_eq!(declared_names(FS, "uniform"), vec!["u_Color", "u_Bones"]);
        assert!(declared_names("uniformity = 1;", "uniform").is_empty());
    }

    #[test]
    fn draw_snapshots_enabled_attribs_and_state() {
        let mut gl = RecordingContext::new();
        let program = build_program(&mut gl, VS, FS).unwrap();
        let pos = gl.attrib_location(program, "a_Position").unwrap();
        let tex = gl.attrib_location(program, "a_TexCoord").unwrap();
        let color = gl.uniform_location(program, "u_Color").unwrap();

        gl.use_program(program);
        gl.vertex_attrib_f32(pos, 3, &[0.0; 12]);
        gl.vertex_attrib_f32(tex, 2, &[1.0; 8]);
        gl.enable_vertex_attrib(pos);
        gl.uniform_vec4(color, [1.0, 0.0, 0.0, 1.0]);
        gl.set_capability(Capability::Blend, true);
        gl.draw_arrays(Primitive::TriangleStrip, 0, 4);

        let draw = &gl.draws()[0];
        assert_eq!(draw.program, Some(program));
        assert!(draw.blend);
        assert!(!draw.depth_test);
        assert_eq!(draw.attribs.len(), 1, "only enabled attribs are captured");
        assert_eq!(draw.attribs[&pos].len(), 12);
        assert_eq!(draw.vec4(color), Some([1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn uniforms_are_scoped_to_their_program() {
        let mut gl = RecordingContext::new();
        let a = build_program(&mut gl, VS, FS).unwrap();
        let b = build_program(&mut gl, VS, FS).unwrap();
        let color = gl.uniform_location(a, "u_Color").unwrap();
        gl.use_program(a);
        gl.uniform_vec4(color, [0.5; 4]);
        gl.use_program(b);
        gl.draw_arrays(Primitive::LineLoop, 0, 4);
        assert!(gl.draws()[0].uniforms.is_empty());
    }

    #[test]
    fn deleting_a_program_drops_its_uniform_values() {
        let mut gl = RecordingContext::new();
        let program = build_program(&mut gl, VS, FS).unwrap();
        let color = gl.uniform_location(program, "u_Color").unwrap();
        gl.use_program(program);
        gl.uniform_vec4(color, [0.5; 4]);
        assert_eq!(gl.live_uniform_values(), 1);

        gl.delete_program(program);
        assert_eq!(gl.live_uniform_values(), 0);
        assert_eq!(gl.current_program(), None);
    }

    #[test]
    fn release_transient_drops_vertex_streams_only() {
        let mut gl = RecordingContext::new();
        let program = build_program(&mut gl, VS, FS).unwrap();
        let pos = gl.attrib_location(program, "a_Position").unwrap();
        gl.vertex_attrib_f32(pos, 3, &[0.0; 9]);
        gl.enable_vertex_attrib(pos);
        assert_eq!(gl.live_vertex_streams(), vec![pos]);

        gl.release_transient();
        assert!(gl.live_vertex_streams().is_empty());
        assert_eq!(gl.live_programs(), vec![program], "programs belong to their owner");
        assert_eq!(gl.calls().last(), Some(&GlCall::ReleaseTransient));

        gl.use_program(program);
        gl.draw_arrays(Primitive::TriangleFan, 0, 3);
        assert!(gl.draws()[0].attribs.is_empty());
    }

    #[test]
    fn identical_call_streams_share_a_digest() {
        let run = || {
            let mut gl = RecordingContext::new();
            gl.clear_color([0.1, 0.1, 0.1, 1.0]);
            gl.clear(true, true);
            gl.draw_arrays(Primitive::TriangleFan, 0, 5);
            gl.digest()
        };
        assert_eq!(run(), run());
        assert_eq!(run().len(), 64);

        let mut other = RecordingContext::new();
        other.clear(true, false);
        assert_ne!(other.digest(), run());
    }

    #[test]
    fn texture_failure_injection() {
        let mut gl = RecordingContext::new();
        gl.fail_texture_allocation(true);
        assert!(matches!(gl.create_external_texture(), Err(GfxError::Allocation(_))));
        gl.fail_texture_allocation(false);
        let t = gl.create_external_texture().unwrap();
        assert_eq!(gl.live_textures(), vec![t]);
        gl.delete_texture(t);
        assert!(gl.live_textures().is_empty());
    }
}
