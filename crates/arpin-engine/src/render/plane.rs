//! Translucent plane overlay.

use arpin_core::math::{model_view_projection, Mat4};
use arpin_core::trackable::Plane;
use arpin_gfx::prelude::*;

use super::FlatProgram;

/// Fills each tracked plane's polygon with a translucent color.
///
/// Vertices are already in world space, so the model matrix is identity.
#[derive(Debug)]
pub struct PlaneRenderer {
    gpu: Option<FlatProgram>,
    color: [f32; 4],
}

impl PlaneRenderer {
    /// An uninitialized renderer drawing in `color`.
    pub fn new(color: [f32; 4]) -> Self {
        Self { gpu: None, color }
    }

    /// Build the program. Handles from a previous surface are forgotten.
    ///
    /// # Errors
    ///
    /// Any [`GfxError`] from program construction.
    pub fn initialize<G: GlContext + ?Sized>(&mut self, gl: &mut G) -> Result<(), GfxError> {
        self.gpu = None;
        self.gpu = Some(FlatProgram::build(gl)?);
        Ok(())
    }

    /// Whether GPU resources exist.
    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Draw every tracking plane with a non-empty polygon as a triangle fan
    /// under alpha blending. Returns the number of planes drawn.
    pub fn render<'a, G, I>(&self, gl: &mut G, planes: I, view: &Mat4, projection: &Mat4) -> usize
    where
        G: GlContext + ?Sized,
        I: IntoIterator<Item = &'a Plane>,
    {
        let Some(gpu) = self.gpu else {
            return 0;
        };

        gl.use_program(gpu.program);
        gl.set_capability(Capability::Blend, true);
        gl.blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);

        let mvp = model_view_projection(projection, view, &Mat4::IDENTITY).to_cols_array();
        let mut drawn = 0;
        for plane in planes {
            if !plane.tracking_state.is_tracking() || plane.vertex_count() == 0 {
                continue;
            }
            let vertices = plane.world_vertices();
            gl.vertex_attrib_f32(gpu.position, 3, &vertices);
            gl.enable_vertex_attrib(gpu.position);
            gl.uniform_mat4(gpu.mvp, &mvp);
            gl.uniform_vec4(gpu.color, self.color);
            gl.draw_arrays(Primitive::TriangleFan, 0, plane.vertex_count() as u32);
            gl.disable_vertex_attrib(gpu.position);
            drawn += 1;
        }

        gl.set_capability(Capability::Blend, false);
        drawn
    }

    /// Delete the program.
    pub fn release<G: GlContext + ?Sized>(&mut self, gl: &mut G) {
        if let Some(gpu) = self.gpu.take() {
            gpu.release(gl);
        }
    }
}
