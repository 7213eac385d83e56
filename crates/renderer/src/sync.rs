use timeline::PhaseSet;

use crate::program::{GraphicsBackend, ProgramContext, ShaderProgram};

/// Everything pushed to the shader for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformFrame {
    pub dims: [f32; 2],
    pub eye: [f32; 3],
    pub inv_view_proj: [[f32; 4]; 4],
    pub phases: PhaseSet,
}

impl UniformFrame {
    /// Phases in `u_Time`, `u_TimeAux1..4` order.
    pub fn times(&self) -> [f32; 5] {
        self.phases.to_array().map(|phase| phase as f32)
    }
}

/// Writes `frame` into `program`, binding it first if needed.
///
/// Uniforms the program does not declare are skipped silently.
pub fn sync_uniforms<B: GraphicsBackend>(
    gl: &mut ProgramContext<B>,
    program: &ShaderProgram<B>,
    frame: &UniformFrame,
) {
    program.set_dims(gl, frame.dims[0], frame.dims[1]);
    program.set_eye_pos(gl, frame.eye);
    program.set_inv_view_proj(gl, frame.inv_view_proj);
    program.set_times(gl, frame.times());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::testing::{Call, RecordingBackend};
    use crate::program::{UniformLocation, UniformName, UniformValue};

    const IDENTITY: [[f32; 4]; 4] = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    fn frame() -> UniformFrame {
        UniformFrame {
            dims: [1920.0, 1080.0],
            eye: [0.0, 0.0, 5.0],
            inv_view_proj: IDENTITY,
            phases: PhaseSet {
                raw: 2.91,
                aux1: 2.91,
                aux2: 0.0,
                aux3: 0.0,
                panel: 2.91,
            },
        }
    }

    #[test]
    fn writes_every_declared_uniform_in_order() {
        let backend = RecordingBackend::default().with_program(1, &UniformName::ALL);
        let program = ShaderProgram::new(&backend, 1);
        let mut gl = ProgramContext::new(backend);

        sync_uniforms(&mut gl, &program, &frame());

        let writes = gl.backend().writes();
        assert_eq!(writes.len(), 8);
        assert_eq!(writes[0].1, UniformValue::Vec2([1920.0, 1080.0]));
        assert_eq!(writes[1].1, UniformValue::Vec3([0.0, 0.0, 5.0]));
        assert_eq!(writes[2].1, UniformValue::Mat4(IDENTITY));
        assert_eq!(writes[3].1, UniformValue::Float(2.91));
        assert_eq!(writes[7].1, UniformValue::Float(2.91));
        assert_eq!(gl.backend().activations(), 1);
    }

    #[test]
    fn skips_unused_uniform_without_touching_others() {
        let declared = [
            UniformName::Dims,
            UniformName::InvViewProj,
            UniformName::Time,
            UniformName::TimeAux1,
            UniformName::TimeAux2,
            UniformName::TimeAux3,
            UniformName::TimeAux4,
        ];
        let backend = RecordingBackend::default().with_program(1, &declared);
        let program = ShaderProgram::new(&backend, 1);
        assert_eq!(program.locations().eye_pos, None);
        let mut gl = ProgramContext::new(backend);

        sync_uniforms(&mut gl, &program, &frame());

        let writes = gl.backend().writes();
        assert_eq!(writes.len(), 7);
        assert!(writes
            .iter()
            .all(|(_, value)| !matches!(value, UniformValue::Vec3(_))));
        assert_eq!(
            writes[1],
            (UniformLocation(1), UniformValue::Mat4(IDENTITY))
        );
    }

    #[test]
    fn consecutive_frames_bind_the_program_once() {
        let backend = RecordingBackend::default().with_program(4, &UniformName::ALL);
        let program = ShaderProgram::new(&backend, 4);
        let mut gl = ProgramContext::new(backend);

        sync_uniforms(&mut gl, &program, &frame());
        sync_uniforms(&mut gl, &program, &frame());

        assert_eq!(gl.backend().activations(), 1);
        assert_eq!(gl.backend().calls[0], Call::Use(4));
    }
}
