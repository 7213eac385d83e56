//! Backend-neutral shader program handle.
//!
//! A [`ProgramContext`] owns the graphics backend plus the marker for the
//! program that is currently bound. Every [`ShaderProgram`] setter goes
//! through [`ProgramContext::activate`], which only reaches the backend when
//! the bound program actually changes.

use std::fmt;

use tracing::trace;

use crate::RenderError;

/// Uniforms the raymarch shader may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformName {
    Dims,
    EyePos,
    InvViewProj,
    Time,
    TimeAux1,
    TimeAux2,
    TimeAux3,
    TimeAux4,
}

impl UniformName {
    pub const ALL: [UniformName; 8] = [
        UniformName::Dims,
        UniformName::EyePos,
        UniformName::InvViewProj,
        UniformName::Time,
        UniformName::TimeAux1,
        UniformName::TimeAux2,
        UniformName::TimeAux3,
        UniformName::TimeAux4,
    ];

    /// Identifier used in GLSL sources.
    pub fn glsl_name(self) -> &'static str {
        match self {
            UniformName::Dims => "u_Dims",
            UniformName::EyePos => "u_EyePos",
            UniformName::InvViewProj => "u_InvViewProj",
            UniformName::Time => "u_Time",
            UniformName::TimeAux1 => "u_TimeAux1",
            UniformName::TimeAux2 => "u_TimeAux2",
            UniformName::TimeAux3 => "u_TimeAux3",
            UniformName::TimeAux4 => "u_TimeAux4",
        }
    }
}

impl fmt::Display for UniformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

/// Backend-specific slot of a uniform inside a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Mat4([[f32; 4]; 4]),
}

/// Geometry the backend can draw with a program.
pub trait Drawable {
    /// Number of indices submitted per draw.
    fn element_count(&self) -> u32;
}

/// The small slice of a graphics API the render loop needs.
pub trait GraphicsBackend {
    type Program: Copy + Eq + fmt::Debug;
    type Mesh: Drawable;

    /// Binds `program` for subsequent uniform writes and draws.
    fn use_program(&mut self, program: Self::Program);

    /// `None` when the program does not consume the uniform.
    fn uniform_location(&self, program: Self::Program, name: UniformName)
        -> Option<UniformLocation>;

    /// Writes to the currently bound program.
    fn write_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn draw(&mut self, mesh: &Self::Mesh) -> Result<(), RenderError>;
}

/// Owns the backend and tracks which program it has bound.
pub struct ProgramContext<B: GraphicsBackend> {
    backend: B,
    active: Option<B::Program>,
}

impl<B: GraphicsBackend> ProgramContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn active(&self) -> Option<B::Program> {
        self.active
    }

    /// Binds `program` unless it is already bound. Returns whether the backend was called.
    pub fn activate(&mut self, program: B::Program) -> bool {
        if self.active == Some(program) {
            return false;
        }
        trace!(?program, "binding shader program");
        self.backend.use_program(program);
        self.active = Some(program);
        true
    }

    fn write(&mut self, location: Option<UniformLocation>, value: UniformValue) {
        if let Some(location) = location {
            self.backend.write_uniform(location, value);
        }
    }
}

/// Uniform slots resolved once when the program is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UniformLocations {
    pub dims: Option<UniformLocation>,
    pub eye_pos: Option<UniformLocation>,
    pub inv_view_proj: Option<UniformLocation>,
    pub times: [Option<UniformLocation>; 5],
}

impl UniformLocations {
    pub fn resolve<B: GraphicsBackend>(backend: &B, program: B::Program) -> Self {
        let lookup = |name| backend.uniform_location(program, name);
        Self {
            dims: lookup(UniformName::Dims),
            eye_pos: lookup(UniformName::EyePos),
            inv_view_proj: lookup(UniformName::InvViewProj),
            times: [
                lookup(UniformName::Time),
                lookup(UniformName::TimeAux1),
                lookup(UniformName::TimeAux2),
                lookup(UniformName::TimeAux3),
                lookup(UniformName::TimeAux4),
            ],
        }
    }

    pub fn get(&self, name: UniformName) -> Option<UniformLocation> {
        match name {
            UniformName::Dims => self.dims,
            UniformName::EyePos => self.eye_pos,
            UniformName::InvViewProj => self.inv_view_proj,
            UniformName::Time => self.times[0],
            UniformName::TimeAux1 => self.times[1],
            UniformName::TimeAux2 => self.times[2],
            UniformName::TimeAux3 => self.times[3],
            UniformName::TimeAux4 => self.times[4],
        }
    }

    /// Uniforms the program does not declare; writes to these are skipped.
    pub fn unused(&self) -> Vec<UniformName> {
        UniformName::ALL
            .into_iter()
            .filter(|name| self.get(*name).is_none())
            .collect()
    }
}

/// A linked program plus its resolved uniform slots.
pub struct ShaderProgram<B: GraphicsBackend> {
    handle: B::Program,
    locations: UniformLocations,
}

impl<B: GraphicsBackend> ShaderProgram<B> {
    pub fn new(backend: &B, handle: B::Program) -> Self {
        let locations = UniformLocations::resolve(backend, handle);
        let unused = locations.unused();
        if !unused.is_empty() {
            tracing::debug!(?handle, ?unused, "shader program ignores some uniforms");
        }
        Self { handle, locations }
    }

    pub fn handle(&self) -> B::Program {
        self.handle
    }

    pub fn locations(&self) -> &UniformLocations {
        &self.locations
    }

    pub fn use_program(&self, gl: &mut ProgramContext<B>) -> bool {
        gl.activate(self.handle)
    }

    pub fn set_dims(&self, gl: &mut ProgramContext<B>, width: f32, height: f32) {
        self.use_program(gl);
        gl.write(self.locations.dims, UniformValue::Vec2([width, height]));
    }

    pub fn set_eye_pos(&self, gl: &mut ProgramContext<B>, eye: [f32; 3]) {
        self.use_program(gl);
        gl.write(self.locations.eye_pos, UniformValue::Vec3(eye));
    }

    pub fn set_inv_view_proj(&self, gl: &mut ProgramContext<B>, matrix: [[f32; 4]; 4]) {
        self.use_program(gl);
        gl.write(self.locations.inv_view_proj, UniformValue::Mat4(matrix));
    }

    /// Writes `u_Time` followed by `u_TimeAux1..4`.
    pub fn set_times(&self, gl: &mut ProgramContext<B>, times: [f32; 5]) {
        self.use_program(gl);
        for (location, value) in self.locations.times.iter().zip(times) {
            gl.write(*location, UniformValue::Float(value));
        }
    }

    pub fn draw(&self, gl: &mut ProgramContext<B>, mesh: &B::Mesh) -> Result<(), RenderError> {
        self.use_program(gl);
        gl.backend.draw(mesh)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Use(u32),
        Write(u32, UniformLocation, UniformValue),
        Draw(u32, u32),
    }

    pub(crate) struct Quad;

    impl Drawable for Quad {
        fn element_count(&self) -> u32 {
            6
        }
    }

    /// Records every backend call; programs declare the uniforms listed for them.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub declared: HashMap<u32, Vec<UniformName>>,
        pub bound: Option<u32>,
        pub calls: Vec<Call>,
        pub fail_draws: bool,
    }

    impl RecordingBackend {
        pub(crate) fn with_program(mut self, program: u32, uniforms: &[UniformName]) -> Self {
            self.declared.insert(program, uniforms.to_vec());
            self
        }

        pub(crate) fn activations(&self) -> usize {
            self.calls
                .iter()
                .filter(|call| matches!(call, Call::Use(_)))
                .count()
        }

        pub(crate) fn writes(&self) -> Vec<(UniformLocation, UniformValue)> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Write(_, location, value) => Some((*location, *value)),
                    _ => None,
                })
                .collect()
        }
    }

    impl GraphicsBackend for RecordingBackend {
        type Program = u32;
        type Mesh = Quad;

        fn use_program(&mut self, program: u32) {
            self.bound = Some(program);
            self.calls.push(Call::Use(program));
        }

        fn uniform_location(&self, program: u32, name: UniformName) -> Option<UniformLocation> {
            let declared = self.declared.get(&program)?;
            declared
                .iter()
                .position(|candidate| *candidate == name)
                .map(|index| UniformLocation(index as u32))
        }

        fn write_uniform(&mut self, location: UniformLocation, value: UniformValue) {
            let program = self.bound.expect("write without a bound program");
            self.calls.push(Call::Write(program, location, value));
        }

        fn draw(&mut self, mesh: &Quad) -> Result<(), RenderError> {
            let program = self.bound.ok_or(RenderError::NoProgramBound)?;
            if self.fail_draws {
                return Err(RenderError::Shader("device lost".to_string()));
            }
            self.calls.push(Call::Draw(program, mesh.element_count()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn repeated_use_binds_once() {
        let backend = RecordingBackend::default().with_program(1, &UniformName::ALL);
        let program = ShaderProgram::new(&backend, 1);
        let mut gl = ProgramContext::new(backend);

        assert!(program.use_program(&mut gl));
        assert!(!program.use_program(&mut gl));
        assert_eq!(gl.backend().activations(), 1);
        assert_eq!(gl.active(), Some(1));
    }

    #[test]
    fn switching_programs_rebinds() {
        let backend = RecordingBackend::default()
            .with_program(1, &UniformName::ALL)
            .with_program(2, &UniformName::ALL);
        let first = ShaderProgram::new(&backend, 1);
        let second = ShaderProgram::new(&backend, 2);
        let mut gl = ProgramContext::new(backend);

        first.set_dims(&mut gl, 1.0, 1.0);
        second.set_dims(&mut gl, 2.0, 2.0);
        first.set_dims(&mut gl, 3.0, 3.0);
        assert_eq!(gl.backend().activations(), 3);
    }

    #[test]
    fn setters_skip_undeclared_uniforms() {
        let backend = RecordingBackend::default()
            .with_program(7, &[UniformName::Time, UniformName::TimeAux3]);
        let program = ShaderProgram::new(&backend, 7);
        let mut gl = ProgramContext::new(backend);

        program.set_eye_pos(&mut gl, [0.0, 0.0, 5.0]);
        program.set_times(&mut gl, [1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(
            gl.backend().writes(),
            vec![
                (UniformLocation(0), UniformValue::Float(1.0)),
                (UniformLocation(1), UniformValue::Float(4.0)),
            ]
        );
        assert_eq!(program.locations().unused().len(), 6);
    }

    #[test]
    fn draw_binds_before_submitting() {
        let backend = RecordingBackend::default().with_program(3, &[]);
        let program = ShaderProgram::new(&backend, 3);
        let mut gl = ProgramContext::new(backend);

        program.draw(&mut gl, &Quad).unwrap();
        assert_eq!(gl.backend().calls, vec![Call::Use(3), Call::Draw(3, 6)]);
    }
}
