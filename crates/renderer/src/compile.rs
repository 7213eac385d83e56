use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::program::UniformName;
use crate::RenderError;

/// Uniforms a raymarch fragment shader declares at global scope.
///
/// Anything the shader leaves out is reported as an unused location and
/// never written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInterface {
    declared: Vec<UniformName>,
    unsupported: Vec<String>,
}

impl ShaderInterface {
    pub fn scan(source: &str) -> Self {
        let mut interface = Self::default();
        for line in source.lines() {
            if let Line::Uniforms(names) = classify(line) {
                for name in names {
                    match lookup(name) {
                        Some(known) if !interface.declared.contains(&known) => {
                            interface.declared.push(known)
                        }
                        Some(_) => {}
                        None => interface.unsupported.push(name.to_string()),
                    }
                }
            }
        }
        interface
    }

    pub fn declares(&self, name: UniformName) -> bool {
        self.declared.contains(&name)
    }

    pub fn declared(&self) -> &[UniformName] {
        &self.declared
    }

    /// Uniform names the pipeline cannot feed.
    pub fn unsupported(&self) -> &[String] {
        &self.unsupported
    }
}

enum Line<'a> {
    Version,
    Precision,
    Varying,
    Uniforms(Vec<&'a str>),
    Code,
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("#version") {
        return Line::Version;
    }
    if trimmed.starts_with("precision ") {
        return Line::Precision;
    }
    if (trimmed.starts_with("in ") && trimmed.contains("fs_Pos"))
        || (trimmed.starts_with("out ") && trimmed.contains("out_Col"))
    {
        return Line::Varying;
    }
    let Some(rest) = trimmed.strip_prefix("uniform ") else {
        return Line::Code;
    };
    let declaration = rest.split(';').next().unwrap_or_default();
    let mut words = declaration
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|word| !word.is_empty());
    let mut ty = words.next();
    if matches!(ty, Some("lowp" | "mediump" | "highp")) {
        ty = words.next();
    }
    if ty.is_none() {
        return Line::Code;
    }
    let names: Vec<&str> = words
        .filter_map(|word| word.split('[').next())
        .filter(|word| word.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_'))
        .collect();
    if names.is_empty() {
        return Line::Code;
    }
    Line::Uniforms(names)
}

fn lookup(name: &str) -> Option<UniformName> {
    UniformName::ALL
        .into_iter()
        .find(|candidate| candidate.glsl_name() == name)
}

/// Compiles the pass-through vertex shader for the fullscreen quad.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen quad vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Wraps a raymarch fragment shader and compiles it as Vulkan GLSL.
pub(crate) fn compile_fragment_shader(
    device: &wgpu::Device,
    source: &str,
) -> Result<(wgpu::ShaderModule, ShaderInterface), RenderError> {
    let interface = ShaderInterface::scan(source);
    if !interface.unsupported().is_empty() {
        return Err(RenderError::Shader(format!(
            "unsupported uniforms: {}",
            interface.unsupported().join(", ")
        )));
    }
    let wrapped = wrap_raymarch_fragment(source, &interface);
    tracing::trace!(wrapped = %wrapped, "wrapped fragment shader");

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("raymarch fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(wrapped),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::Shader(err.to_string()));
    }
    Ok((module, interface))
}

/// Produces a self-contained Vulkan GLSL fragment shader.
///
/// `#version`, `precision` and the `fs_Pos`/`out_Col` varyings are replaced
/// by [`HEADER`]; uniform declarations are replaced by macros into the
/// uniform block, one per declared uniform.
pub(crate) fn wrap_raymarch_fragment(source: &str, interface: &ShaderInterface) -> String {
    let mut wrapped = String::with_capacity(HEADER.len() + source.len() + 256);
    wrapped.push_str(HEADER);
    for name in interface.declared() {
        wrapped.push_str(&format!(
            "#define {glsl} scoremarch_ubo._{glsl}\n",
            glsl = name.glsl_name()
        ));
    }
    wrapped.push_str("#line 1\n");
    for line in source.lines() {
        match classify(line) {
            Line::Code => wrapped.push_str(line),
            Line::Version | Line::Precision | Line::Varying | Line::Uniforms(_) => {}
        }
        // keep line numbers aligned with the user's file
        wrapped.push('\n');
    }
    wrapped
}

const HEADER: &str = r"#version 450
layout(location = 0) in vec2 fs_Pos;
layout(location = 0) out vec4 out_Col;

layout(std140, set = 0, binding = 0) uniform RaymarchParams {
    mat4 _u_InvViewProj;
    vec3 _u_EyePos;
    float _u_Time;
    vec2 _u_Dims;
    float _u_TimeAux1;
    float _u_TimeAux2;
    float _u_TimeAux3;
    float _u_TimeAux4;
} scoremarch_ubo;

";

const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec4 vs_Pos;
layout(location = 0) out vec2 fs_Pos;

void main() {
    fs_Pos = vs_Pos.xy;
    gl_Position = vs_Pos;
}
";

#[cfg(test)]
mod tests {
    use super::*;

    const SHADER: &str = "#version 300 es
precision highp float;

uniform mat4 u_InvViewProj;
uniform vec2 u_Dims;
uniform float u_Time, u_TimeAux2;
uniform highp vec3 u_EyePos;

in vec2 fs_Pos;
out vec4 out_Col;

void main() {
    out_Col = vec4(fs_Pos, sin(u_Time), 1.0);
}
";

    #[test]
    fn scans_declared_uniforms() {
        let interface = ShaderInterface::scan(SHADER);
        assert_eq!(
            interface.declared(),
            &[
                UniformName::InvViewProj,
                UniformName::Dims,
                UniformName::Time,
                UniformName::TimeAux2,
                UniformName::EyePos,
            ]
        );
        assert!(!interface.declares(UniformName::TimeAux4));
        assert!(interface.unsupported().is_empty());
    }

    #[test]
    fn flags_uniforms_the_pipeline_cannot_feed() {
        let interface = ShaderInterface::scan("uniform sampler2D u_Noise;\nuniform float u_Time;\n");
        assert_eq!(interface.unsupported(), &["u_Noise".to_string()]);
        assert_eq!(interface.declared(), &[UniformName::Time]);
    }

    #[test]
    fn wrapping_replaces_declarations_and_keeps_line_count() {
        let interface = ShaderInterface::scan(SHADER);
        let wrapped = wrap_raymarch_fragment(SHADER, &interface);

        assert!(wrapped.starts_with("#version 450\n"));
        assert_eq!(wrapped.matches("#version").count(), 1);
        assert!(!wrapped.contains("precision highp"));
        assert!(!wrapped.contains("uniform float u_Time"));
        assert!(wrapped.contains("#define u_Time scoremarch_ubo._u_Time\n"));
        assert!(wrapped.contains("#define u_EyePos scoremarch_ubo._u_EyePos\n"));
        assert!(!wrapped.contains("#define u_TimeAux1 "));
        assert!(wrapped.contains("out_Col = vec4(fs_Pos, sin(u_Time), 1.0);"));

        let body = wrapped.split("#line 1\n").nth(1).unwrap();
        assert_eq!(body.lines().count(), SHADER.lines().count());
    }

    #[test]
    fn block_declarations_are_left_alone() {
        let source = "uniform Params {\n    float scale;\n} params;\n";
        let interface = ShaderInterface::scan(source);
        assert!(interface.declared().is_empty());
        assert!(interface.unsupported().is_empty());
        assert!(wrap_raymarch_fragment(source, &interface).contains("uniform Params {"));
    }
}
