use std::borrow::Cow;

use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Handle, Module, Type, TypeInner};

use crate::error::{BackgroundError, StageKind};
use crate::inputs::UNIFORM_OFFSETS;

/// Vertex attribute carrying the clip-space corner position.
pub const POSITION_ATTRIBUTE: &str = "a_position";
/// Vertex attribute carrying the texture coordinate.
pub const UV_ATTRIBUTE: &str = "a_uv";

/// Pass-through vertex stage for the full-viewport quad.
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 1) in vec2 a_uv;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = a_uv;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Iridescence pattern. `shading::shade` evaluates the same law on the CPU.
pub const FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform BackgroundParams {
    vec2 u_resolution;
    vec2 u_mouse;
    vec3 u_color;
    float u_time;
    float u_amplitude;
    float u_speed;
} params;

void main() {
    float mr = min(params.u_resolution.x, params.u_resolution.y);
    vec2 uv = (v_uv * 2.0 - 1.0) * params.u_resolution / mr;
    uv += (params.u_mouse - vec2(0.5)) * params.u_amplitude;

    float d = -params.u_time * 0.5 * params.u_speed;
    float a = 0.0;
    for (float i = 0.0; i < 8.0; i += 1.0) {
        a += cos(i - d - a * uv.x);
        d += sin(uv.y * i + a);
    }
    d += params.u_time * 0.5 * params.u_speed;

    vec3 col = vec3(cos(uv * vec2(d, a)) * 0.6 + 0.4, cos(a + d) * 0.5 + 0.5);
    col = cos(col * cos(vec3(d, a, 2.5)) * 0.5 + 0.5) * params.u_color;
    out_color = vec4(col, 1.0);
}
";

/// Source text for both stages of the shading program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl Default for ProgramSource {
    fn default() -> Self {
        Self {
            vertex: Cow::Borrowed(VERTEX_SHADER_GLSL),
            fragment: Cow::Borrowed(FRAGMENT_SHADER_GLSL),
        }
    }
}

/// A stage that parsed and validated cleanly.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    stage: StageKind,
    source: String,
    module: Module,
}

impl CompiledStage {
    pub fn stage(&self) -> StageKind {
        self.stage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn module(&self) -> &Module {
        &self.module
    }
}

/// Where one named program input lives inside the uniform block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub offset: u32,
}

/// Resolved input slots of a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSlots {
    /// Bind group index of the uniform block.
    pub group: u32,
    /// Binding index of the uniform block inside its group.
    pub binding: u32,
    /// Size of the uniform block in bytes.
    pub block_size: u32,
    pub uniforms: Vec<UniformSlot>,
    /// Shader location of [`POSITION_ATTRIBUTE`].
    pub position_location: u32,
    /// Shader location of [`UV_ATTRIBUTE`].
    pub uv_location: u32,
}

impl InputSlots {
    pub fn uniform(&self, name: &str) -> Option<&UniformSlot> {
        self.uniforms.iter().find(|slot| slot.name == name)
    }
}

/// Compiled vertex and fragment stages plus their resolved input slots.
#[derive(Debug, Clone)]
pub struct ShadingProgram {
    vertex: CompiledStage,
    fragment: CompiledStage,
    slots: InputSlots,
}

impl ShadingProgram {
    pub fn vertex(&self) -> &CompiledStage {
        &self.vertex
    }

    pub fn fragment(&self) -> &CompiledStage {
        &self.fragment
    }

    pub fn slots(&self) -> &InputSlots {
        &self.slots
    }
}

/// Compiles and links both stages of `source`.
pub fn build_program(source: &ProgramSource) -> Result<ShadingProgram, BackgroundError> {
    let vertex = compile_stage(StageKind::Vertex, &source.vertex)?;
    let fragment = compile_stage(StageKind::Fragment, &source.fragment)?;
    link_program(vertex, fragment)
}

/// Parses and validates a single GLSL stage.
pub fn compile_stage(stage: StageKind, source: &str) -> Result<CompiledStage, BackgroundError> {
    let mut frontend = Frontend::default();
    let options = Options::from(stage.as_naga());
    let module = frontend.parse(&options, source).map_err(|errors| {
        let diagnostic = errors
            .errors
            .iter()
            .map(|error| error.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        compile_error(stage, diagnostic)
    })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::default());
    validator
        .validate(&module)
        .map_err(|error| compile_error(stage, error.as_inner().to_string()))?;

    if !module.entry_points.iter().any(|ep| ep.stage == stage.as_naga()) {
        return Err(compile_error(
            stage,
            format!("source declares no {stage} entry point"),
        ));
    }

    Ok(CompiledStage {
        stage,
        source: source.to_string(),
        module,
    })
}

fn compile_error(stage: StageKind, diagnostic: String) -> BackgroundError {
    let diagnostic = if diagnostic.trim().is_empty() {
        "compiler reported an error without a message".to_string()
    } else {
        diagnostic
    };
    BackgroundError::ShaderCompile { stage, diagnostic }
}

/// Checks that the stages agree on their interface and resolves every
/// program input to a slot.
pub fn link_program(
    vertex: CompiledStage,
    fragment: CompiledStage,
) -> Result<ShadingProgram, BackgroundError> {
    if vertex.stage != StageKind::Vertex || fragment.stage != StageKind::Fragment {
        return Err(BackgroundError::link(
            "program needs one vertex and one fragment stage",
        ));
    }

    let outputs = stage_outputs(&vertex)?;
    for input in stage_inputs(&fragment)? {
        let matched = outputs.iter().find(|output| output.location == input.location);
        match matched {
            None => {
                return Err(BackgroundError::link(format!(
                    "fragment input '{}' at location {} is not written by the vertex stage",
                    input.display_name(),
                    input.location
                )))
            }
            Some(output) if output.inner != input.inner => {
                return Err(BackgroundError::link(format!(
                    "fragment input '{}' at location {} does not match the vertex output type",
                    input.display_name(),
                    input.location
                )))
            }
            Some(_) => {}
        }
    }

    let attributes = stage_inputs(&vertex)?;
    let position_location = attribute_location(&attributes, POSITION_ATTRIBUTE)?;
    let uv_location = attribute_location(&attributes, UV_ATTRIBUTE)?;
    let block = resolve_uniform_block(fragment.module())?;

    tracing::debug!(
        group = block.group,
        binding = block.binding,
        block_size = block.block_size,
        position_location,
        uv_location,
        "linked shading program"
    );

    Ok(ShadingProgram {
        vertex,
        fragment,
        slots: InputSlots {
            group: block.group,
            binding: block.binding,
            block_size: block.block_size,
            uniforms: block.uniforms,
            position_location,
            uv_location,
        },
    })
}

#[derive(Debug)]
struct InterfaceVar {
    name: Option<String>,
    location: u32,
    inner: TypeInner,
}

impl InterfaceVar {
    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

fn entry_point(stage: &CompiledStage) -> Result<&naga::EntryPoint, BackgroundError> {
    stage
        .module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage.stage.as_naga())
        .ok_or_else(|| BackgroundError::link(format!("{} stage has no entry point", stage.stage)))
}

fn stage_inputs(stage: &CompiledStage) -> Result<Vec<InterfaceVar>, BackgroundError> {
    let ep = entry_point(stage)?;
    let mut vars = Vec::new();
    for argument in &ep.function.arguments {
        collect_locations(
            &stage.module,
            argument.ty,
            argument.binding.as_ref(),
            argument.name.as_deref(),
            &mut vars,
        );
    }
    Ok(vars)
}

fn stage_outputs(stage: &CompiledStage) -> Result<Vec<InterfaceVar>, BackgroundError> {
    let ep = entry_point(stage)?;
    let mut vars = Vec::new();
    if let Some(result) = &ep.function.result {
        collect_locations(&stage.module, result.ty, result.binding.as_ref(), None, &mut vars);
    }
    Ok(vars)
}

fn collect_locations(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    name: Option<&str>,
    out: &mut Vec<InterfaceVar>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(InterfaceVar {
            name: name.map(str::to_owned),
            location: *location,
            inner: module.types[ty].inner.clone(),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(
                        module,
                        member.ty,
                        member.binding.as_ref(),
                        member.name.as_deref(),
                        out,
                    );
                }
            }
        }
    }
}

fn attribute_location(attributes: &[InterfaceVar], name: &str) -> Result<u32, BackgroundError> {
    attributes
        .iter()
        .find(|var| var.name.as_deref() == Some(name))
        .map(|var| var.location)
        .ok_or_else(|| {
            BackgroundError::link(format!("vertex stage does not declare attribute '{name}'"))
        })
}

struct UniformBlock {
    group: u32,
    binding: u32,
    block_size: u32,
    uniforms: Vec<UniformSlot>,
}

fn resolve_uniform_block(module: &Module) -> Result<UniformBlock, BackgroundError> {
    let mut blocks = module
        .global_variables
        .iter()
        .filter(|(_, var)| var.space == AddressSpace::Uniform)
        .map(|(_, var)| var);
    let var = blocks
        .next()
        .ok_or_else(|| BackgroundError::link("fragment stage declares no uniform block"))?;
    if blocks.next().is_some() {
        return Err(BackgroundError::link(
            "fragment stage declares more than one uniform block",
        ));
    }

    let resource = var
        .binding
        .as_ref()
        .ok_or_else(|| BackgroundError::link("uniform block has no binding"))?;
    let TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
        return Err(BackgroundError::link("uniform block is not a struct"));
    };

    let mut uniforms = Vec::with_capacity(UNIFORM_OFFSETS.len());
    for (name, expected) in UNIFORM_OFFSETS {
        let member = members
            .iter()
            .find(|member| member.name.as_deref() == Some(name))
            .ok_or_else(|| {
                BackgroundError::link(format!("program input '{name}' is not declared"))
            })?;
        if member.offset as usize != expected {
            return Err(BackgroundError::link(format!(
                "program input '{name}' sits at offset {}, host writes it at {expected}",
                member.offset
            )));
        }
        uniforms.push(UniformSlot {
            name: name.to_string(),
            offset: member.offset,
        });
    }

    if let Some(unknown) = members.iter().find(|member| {
        member
            .name
            .as_deref()
            .map_or(true, |name| !UNIFORM_OFFSETS.iter().any(|(known, _)| *known == name))
    }) {
        return Err(BackgroundError::link(format!(
            "program input '{}' has no host-side value",
            unknown.name.as_deref().unwrap_or("<unnamed>")
        )));
    }

    Ok(UniformBlock {
        group: resource.group,
        binding: resource.binding,
        block_size: *span,
        uniforms,
    })
}
