//! GLSL ES 1.00 sources for the demo's three passes.

/// Full-screen camera quad: passes position and texture coordinate through.
pub const BACKGROUND_VERTEX: &str = "\
attribute vec4 a_Position;
attribute vec2 a_TexCoord;
varying vec2 v_TexCoord;
void main() {
    gl_Position = a_Position;
    v_TexCoord = a_TexCoord;
}
";

/// Samples the camera image through the external-image extension.
pub const BACKGROUND_FRAGMENT: &str = "\
#extension GL_OES_EGL_image_external : require
precision mediump float;
varying vec2 v_TexCoord;
uniform samplerExternalOES sTexture;
void main() {
    gl_FragColor = texture2D(sTexture, v_TexCoord);
}
";

/// World-space geometry transformed by a single MVP matrix.
pub const FLAT_VERTEX: &str = "\
attribute vec4 a_Position;
uniform mat4 u_ModelViewProjection;
void main() {
    gl_Position = u_ModelViewProjection * a_Position;
}
";

/// Solid color from a uniform.
pub const FLAT_FRAGMENT: &str = "\
precision mediump float;
uniform vec4 u_Color;
void main() {
    gl_FragColor = u_Color;
}
";

/// Attribute carrying vertex positions in every pass.
pub const POSITION_ATTRIB: &str = "a_Position";
/// Background texture coordinate attribute.
pub const TEX_COORD_ATTRIB: &str = "a_TexCoord";
/// MVP uniform of the flat pass.
pub const MVP_UNIFORM: &str = "u_ModelViewProjection";
/// Color uniform of the flat pass.
pub const COLOR_UNIFORM: &str = "u_Color";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use crate::recording::RecordingContext;

    #[test]
    fn flat_program_exposes_every_named_slot() {
        let mut gl = RecordingContext::new();
        let program = build_program(&mut gl, FLAT_VERTEX, FLAT_FRAGMENT).unwrap();
        assert!(require_attrib(&mut gl, program, POSITION_ATTRIB).is_ok());
        assert!(require_uniform(&mut gl, program, MVP_UNIFORM).is_ok());
        assert!(require_uniform(&mut gl, program, COLOR_UNIFORM).is_ok());
    }

    #[test]
    fn background_program_exposes_both_attributes() {
        let mut gl = RecordingContext::new();
        let program = build_program(&mut gl, BACKGROUND_VERTEX, BACKGROUND_FRAGMENT).unwrap();
        assert!(require_attrib(&mut gl, program, POSITION_ATTRIB).is_ok());
        assert!(require_attrib(&mut gl, program, TEX_COORD_ATTRIB).is_ok());
    }
}
