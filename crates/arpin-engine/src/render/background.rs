//! Camera background pass.
//!
//! Draws the camera image as a full-screen triangle strip sampled from an
//! external texture that the AR runtime streams into. The texture
//! coordinates follow the display geometry: they are re-derived from the
//! frame's display transform only when the frame reports a geometry change
//! and reused otherwise.

use arpin_core::frame::Frame;
use arpin_gfx::prelude::*;
use arpin_gfx::shaders;

/// Quad corners in clip space, `(x, y, z)` per vertex, strip order.
pub const QUAD_COORDS: [f32; 12] = [
    -1.0, -1.0, 0.0, //
    -1.0, 1.0, 0.0, //
    1.0, -1.0, 0.0, //
    1.0, 1.0, 0.0,
];

/// The same corners as NDC `(x, y)` pairs, fed to the display transform.
pub const NDC_QUAD_COORDS: [f32; 8] = [-1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, 1.0];

/// Texture coordinates used before the first geometry change and whenever
/// the display transform is unavailable.
pub const DEFAULT_TEX_COORDS: [f32; 8] = [0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0];

#[derive(Debug, Clone, Copy)]
struct BackgroundGpu {
    program: ProgramId,
    texture: TextureId,
    position: AttribLocation,
    tex_coord: AttribLocation,
}

/// Full-screen camera quad renderer.
#[derive(Debug)]
pub struct BackgroundRenderer {
    gpu: Option<BackgroundGpu>,
    tex_coords: [f32; 8],
}

impl Default for BackgroundRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundRenderer {
    /// An uninitialized renderer with the default texture coordinates.
    pub fn new() -> Self {
        Self {
            gpu: None,
            tex_coords: DEFAULT_TEX_COORDS,
        }
    }

    /// Allocate the camera texture and build the program.
    ///
    /// Handles from a previous surface are forgotten, not deleted: they died
    /// with the old context.
    ///
    /// # Errors
    ///
    /// Any [`GfxError`]; nothing is left allocated on failure.
    pub fn initialize<G: GlContext + ?Sized>(&mut self, gl: &mut G) -> Result<(), GfxError> {
        self.gpu = None;
        let texture = gl.create_external_texture()?;
        let program = match build_program(gl, shaders::BACKGROUND_VERTEX, shaders::BACKGROUND_FRAGMENT) {
            Ok(program) => program,
            Err(err) => {
                gl.delete_texture(texture);
                return Err(err);
            }
        };
        let slots = require_attrib(gl, program, shaders::POSITION_ATTRIB).and_then(|position| {
            require_attrib(gl, program, shaders::TEX_COORD_ATTRIB).map(|tex| (position, tex))
        });
        let (position, tex_coord) = match slots {
            Ok(slots) => slots,
            Err(err) => {
                gl.delete_program(program);
                gl.delete_texture(texture);
                return Err(err);
            }
        };
        self.gpu = Some(BackgroundGpu {
            program,
            texture,
            position,
            tex_coord,
        });
        tracing::debug!(texture = texture.0, program = program.0, "background renderer initialized");
        Ok(())
    }

    /// Whether GPU resources exist.
    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// The texture the runtime should stream camera images into.
    pub fn texture(&self) -> Option<TextureId> {
        self.gpu.map(|gpu| gpu.texture)
    }

    /// The texture coordinates the next draw will use.
    pub fn tex_coords(&self) -> &[f32; 8] {
        &self.tex_coords
    }

    /// Re-derive texture coordinates if `frame` reports a geometry change.
    /// Falls back to [`DEFAULT_TEX_COORDS`] when the transform fails.
    pub fn update_tex_coords(&mut self, frame: &Frame) {
        if !frame.has_display_geometry_changed() {
            return;
        }
        match frame.transform_coordinates_2d(&NDC_QUAD_COORDS) {
            Ok(uv) if uv.len() == self.tex_coords.len() => {
                self.tex_coords.copy_from_slice(&uv);
            }
            Ok(uv) => {
                tracing::warn!(len = uv.len(), "display transform returned wrong length, using default UVs");
                self.tex_coords = DEFAULT_TEX_COORDS;
            }
            Err(err) => {
                tracing::debug!(error = %err, "display transform failed, using default UVs");
                self.tex_coords = DEFAULT_TEX_COORDS;
            }
        }
    }

    /// Draw the camera quad. Returns the number of quads drawn (0 or 1).
    ///
    /// Depth testing and depth writes are off for the quad and back on
    /// afterward.
    pub fn render<G: GlContext + ?Sized>(&mut self, gl: &mut G, frame: &Frame) -> usize {
        self.update_tex_coords(frame);
        let Some(gpu) = self.gpu else {
            return 0;
        };

        gl.set_capability(Capability::DepthTest, false);
        gl.depth_mask(false);

        gl.use_program(gpu.program);
        gl.bind_external_texture(gpu.texture);
        gl.vertex_attrib_f32(gpu.position, 3, &QUAD_COORDS);
        gl.vertex_attrib_f32(gpu.tex_coord, 2, &self.tex_coords);
        gl.enable_vertex_attrib(gpu.position);
        gl.enable_vertex_attrib(gpu.tex_coord);

        gl.draw_arrays(Primitive::TriangleStrip, 0, 4);

        gl.disable_vertex_attrib(gpu.position);
        gl.disable_vertex_attrib(gpu.tex_coord);

        gl.depth_mask(true);
        gl.set_capability(Capability::DepthTest, true);
        1
    }

    /// Delete the texture and program.
    pub fn release<G: GlContext + ?Sized>(&mut self, gl: &mut G) {
        if let Some(gpu) = self.gpu.take() {
            gl.delete_program(gpu.program);
            gl.delete_texture(gpu.texture);
        }
    }
}
