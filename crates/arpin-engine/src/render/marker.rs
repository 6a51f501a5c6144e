//! Wireframe marker cubes at placed anchors.

use arpin_core::anchor::Anchor;
use arpin_core::math::{model_view_projection, Mat4};
use arpin_gfx::prelude::*;

use super::FlatProgram;

/// Vertices per cube face outline.
pub const FACE_VERTICES: u32 = 4;

/// Face outlines drawn per marker: front, back, left, right.
pub const FACES: u32 = 4;

/// Positions of the four face outlines of an axis-aligned cube centered on
/// the origin, `(x, y, z)` per vertex, [`FACE_VERTICES`] per face.
pub fn cube_wireframe(half_extent: f32) -> Vec<f32> {
    let h = half_extent;
    #[rustfmt::skip]
    let faces: [[f32; 12]; FACES as usize] = [
        // front
        [-h, -h,  h,   h, -h,  h,   h,  h,  h,  -h,  h,  h],
        // back
        [-h, -h, -h,   h, -h, -h,   h,  h, -h,  -h,  h, -h],
        // left
        [-h, -h, -h,  -h, -h,  h,  -h,  h,  h,  -h,  h, -h],
        // right
        [ h, -h, -h,   h, -h,  h,   h,  h,  h,   h,  h, -h],
    ];
    faces.concat()
}

/// Draws a fixed-size wireframe cube at every tracking anchor.
#[derive(Debug)]
pub struct MarkerRenderer {
    gpu: Option<FlatProgram>,
    color: [f32; 4],
    vertices: Vec<f32>,
}

impl MarkerRenderer {
    /// An uninitialized renderer drawing cubes of `half_extent` in `color`.
    pub fn new(color: [f32; 4], half_extent: f32) -> Self {
        Self {
            gpu: None,
            color,
            vertices: cube_wireframe(half_extent),
        }
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

    /// The cube outline vertices in model space.
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Draw one cube per tracking anchor, in iteration order, with depth
    /// testing on. Returns the number of markers drawn.
    pub fn render<'a, G, I>(&self, gl: &mut G, anchors: I, view: &Mat4, projection: &Mat4) -> usize
    where
        G: GlContext + ?Sized,
        I: IntoIterator<Item = &'a Anchor>,
    {
        let Some(gpu) = self.gpu else {
            return 0;
        };
        let mut anchors = anchors.into_iter().peekable();
        if anchors.peek().is_none() {
            return 0;
        }

        gl.use_program(gpu.program);
        gl.set_capability(Capability::DepthTest, true);

        let mut drawn = 0;
        for anchor in anchors {
            if !anchor.tracking_state.is_tracking() {
                continue;
            }
            let mvp = model_view_projection(projection, view, &anchor.pose.to_matrix()).to_cols_array();
            gl.vertex_attrib_f32(gpu.position, 3, &self.vertices);
            gl.enable_vertex_attrib(gpu.position);
            gl.uniform_mat4(gpu.mvp, &mvp);
            gl.uniform_vec4(gpu.color, self.color);
            for face in 0..FACES {
                gl.draw_arrays(Primitive::LineLoop, face * FACE_VERTICES, FACE_VERTICES);
            }
            gl.disable_vertex_attrib(gpu.position);
            drawn += 1;
        }
        drawn
    }

    /// Delete the program.
    pub fn release<G: GlContext + ?Sized>(&mut self, gl: &mut G) {
        if let Some(gpu) = self.gpu.take() {
            gpu.release(gl);
        }
    }
}
