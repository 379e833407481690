use std::borrow::Cow;

use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::{AddressSpace, Binding, Module, ScalarKind, ShaderStage, TypeInner, VectorSize};

use crate::error::{ShaderError, Stage};

/// Name of the uniform block member carrying the combined transform.
pub const MVP_UNIFORM: &str = "u_MVPMatrix";
/// Attribute location of `a_Position`.
pub const POSITION_LOCATION: u32 = 0;
/// Attribute location of `a_Color`.
pub const COLOR_LOCATION: u32 = 1;

/// Vertex stage: transforms the position and forwards the per-vertex color.
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(set = 0, binding = 0) uniform Transform {
    mat4 u_MVPMatrix;
};

layout(location = 0) in vec4 a_Position;
layout(location = 1) in vec4 a_Color;

layout(location = 0) out vec4 v_Color;

void main() {
    v_Color = a_Color;
    gl_Position = u_MVPMatrix * a_Position;
}
";

/// Fragment stage: writes the interpolated color unmodified.
pub const FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec4 v_Color;

layout(location = 0) out vec4 o_Color;

void main() {
    o_Color = v_Color;
}
";

/// Where the MVP matrix lives inside the bound uniform buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub group: u32,
    pub binding: u32,
    /// Byte offset of the matrix inside the block.
    pub offset: u32,
}

/// A validated and linked vertex/fragment pair.
///
/// The sources are kept so the GPU backend can build its modules from the
/// exact text that was checked here.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    vertex_source: String,
    fragment_source: String,
    mvp: UniformSlot,
    position_location: u32,
    color_location: u32,
}

impl ShaderProgram {
    /// Compiles the built-in lamp shaders.
    pub fn builtin() -> Result<Self, ShaderError> {
        Self::compile_and_link(VERTEX_SHADER_GLSL, FRAGMENT_SHADER_GLSL)
    }

    pub fn compile_and_link(
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let vertex = compile_stage(Stage::Vertex, vertex_source)?;
        let fragment = compile_stage(Stage::Fragment, fragment_source)?;

        let vertex_io = StageInterface::of(&vertex, ShaderStage::Vertex)?;
        let fragment_io = StageInterface::of(&fragment, ShaderStage::Fragment)?;

        for location in [POSITION_LOCATION, COLOR_LOCATION] {
            match vertex_io.input(location) {
                Some(inner) if is_vec4(inner) => {}
                Some(_) => {
                    return Err(link_error(format!(
                        "vertex attribute at location {location} must be a vec4"
                    )))
                }
                None => {
                    return Err(link_error(format!(
                        "vertex stage has no active attribute at location {location}"
                    )))
                }
            }
        }

        for (location, inner) in &fragment_io.inputs {
            match vertex_io.output(*location) {
                Some(produced) if produced == inner => {}
                Some(_) => {
                    return Err(link_error(format!(
                        "varying at location {location} has different types in the two stages"
                    )))
                }
                None => {
                    return Err(link_error(format!(
                        "fragment input at location {location} is not written by the vertex stage"
                    )))
                }
            }
        }

        let mvp = find_matrix_uniform(&vertex, MVP_UNIFORM).ok_or_else(|| {
            link_error(format!("no active mat4 uniform named {MVP_UNIFORM}"))
        })?;

        tracing::debug!(
            group = mvp.group,
            binding = mvp.binding,
            offset = mvp.offset,
            "shader program linked"
        );

        Ok(Self {
            vertex_source: vertex_source.to_string(),
            fragment_source: fragment_source.to_string(),
            mvp,
            position_location: POSITION_LOCATION,
            color_location: COLOR_LOCATION,
        })
    }

    pub fn mvp_slot(&self) -> UniformSlot {
        self.mvp
    }

    pub fn position_location(&self) -> u32 {
        self.position_location
    }

    pub fn color_location(&self) -> u32 {
        self.color_location
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    pub(crate) fn create_modules(
        &self,
        device: &wgpu::Device,
    ) -> (wgpu::ShaderModule, wgpu::ShaderModule) {
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lamp vertex"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(self.vertex_source.as_str()),
                stage: ShaderStage::Vertex,
                defines: &[],
            },
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lamp fragment"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(self.fragment_source.as_str()),
                stage: ShaderStage::Fragment,
                defines: &[],
            },
        });
        (vertex, fragment)
    }
}

fn link_error(reason: String) -> ShaderError {
    ShaderError::Link { reason }
}

fn compile_stage(stage: Stage, source: &str) -> Result<Module, ShaderError> {
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage.naga()), source)
        .map_err(|errors| ShaderError::Compile {
            stage,
            diagnostic: errors.emit_to_string(source),
        })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::empty());
    validator
        .validate(&module)
        .map_err(|err| ShaderError::Compile {
            stage,
            diagnostic: err.emit_to_string(source),
        })?;
    Ok(module)
}

/// Location-bound inputs and outputs of a stage's entry point.
struct StageInterface {
    inputs: Vec<(u32, TypeInner)>,
    outputs: Vec<(u32, TypeInner)>,
}

impl StageInterface {
    fn of(module: &Module, stage: ShaderStage) -> Result<Self, ShaderError> {
        let entry = module
            .entry_points
            .iter()
            .find(|entry| entry.stage == stage)
            .ok_or_else(|| link_error(format!("no {stage:?} entry point")))?;

        let inputs = entry
            .function
            .arguments
            .iter()
            .filter_map(|argument| match argument.binding {
                Some(Binding::Location { location, .. }) => {
                    Some((location, module.types[argument.ty].inner.clone()))
                }
                _ => None,
            })
            .collect();

        let mut outputs = Vec::new();
        if let Some(result) = &entry.function.result {
            match (&result.binding, &module.types[result.ty].inner) {
                (Some(Binding::Location { location, .. }), inner) => {
                    outputs.push((*location, inner.clone()));
                }
                (None, TypeInner::Struct { members, .. }) => {
                    for member in members {
                        if let Some(Binding::Location { location, .. }) = member.binding {
                            outputs.push((location, module.types[member.ty].inner.clone()));
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Self { inputs, outputs })
    }

    fn input(&self, location: u32) -> Option<&TypeInner> {
        lookup(&self.inputs, location)
    }

    fn output(&self, location: u32) -> Option<&TypeInner> {
        lookup(&self.outputs, location)
    }
}

fn lookup(entries: &[(u32, TypeInner)], location: u32) -> Option<&TypeInner> {
    entries
        .iter()
        .find(|(candidate, _)| *candidate == location)
        .map(|(_, inner)| inner)
}

fn is_vec4(inner: &TypeInner) -> bool {
    matches!(
        inner,
        TypeInner::Vector {
            size: VectorSize::Quad,
            scalar,
        } if scalar.kind == ScalarKind::Float
    )
}

fn is_mat4(inner: &TypeInner) -> bool {
    matches!(
        inner,
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            ..
        }
    )
}

fn find_matrix_uniform(module: &Module, name: &str) -> Option<UniformSlot> {
    module
        .global_variables
        .iter()
        .filter(|(_, global)| global.space == AddressSpace::Uniform)
        .find_map(|(_, global)| {
            let resource = global.binding.as_ref()?;
            let members = match &module.types[global.ty].inner {
                TypeInner::Struct { members, .. } => members,
                _ => return None,
            };
            members
                .iter()
                .find(|member| {
                    member.name.as_deref() == Some(name) && is_mat4(&module.types[member.ty].inner)
                })
                .map(|member| UniformSlot {
                    group: resource.group,
                    binding: resource.binding,
                    offset: member.offset,
                })
        })
}
