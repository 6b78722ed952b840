use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, Module, ScalarKind, ShaderStage, TypeInner};

use crate::gl::StageKind;

use super::interface::{
    Interpolation, ScalarType, StageInterface, UniformBlock, UniformField, UniformType, Varying,
    VaryingType, VertexInput,
};
use super::ShaderValidator;

/// WGSL front end: parse, validate, reflect.
///
/// Capabilities default to the empty set so anything accepted here is also
/// accepted by a baseline wgpu device.
#[derive(Debug, Clone)]
pub struct WgslValidator {
    capabilities: Capabilities,
}

impl Default for WgslValidator {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::empty(),
        }
    }
}

impl WgslValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    /// Parses and validates `source`, returning the naga module.
    ///
    /// Errors are rendered with source spans, ready for a compile log.
    pub fn parse(&self, source: &str) -> Result<Module, String> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

        Validator::new(ValidationFlags::all(), self.capabilities)
            .validate(&module)
            .map_err(|e| e.emit_to_string(source))?;

        Ok(module)
    }
}

impl ShaderValidator for WgslValidator {
    fn compile(&self, kind: StageKind, source: &str) -> Result<StageInterface, String> {
        let module = self.parse(source)?;
        reflect(&module, kind)
    }
}

/// Extracts the stage interface of `kind` from a validated module.
pub fn reflect(module: &Module, kind: StageKind) -> Result<StageInterface, String> {
    let stage = match kind {
        StageKind::Vertex => ShaderStage::Vertex,
        StageKind::Fragment => ShaderStage::Fragment,
    };

    let entries: Vec<_> = module.entry_points.iter().filter(|ep| ep.stage == stage).collect();
    let entry = match entries.as_slice() {
        [] => return Err(format!("no @{kind} entry point found")),
        [one] => *one,
        many => {
            let names: Vec<&str> = many.iter().map(|ep| ep.name.as_str()).collect();
            return Err(format!(
                "expected exactly one @{kind} entry point, found {}: {}",
                many.len(),
                names.join(", ")
            ));
        }
    };

    let mut args = Vec::new();
    for arg in &entry.function.arguments {
        located(module, arg.binding.as_ref(), arg.ty, arg.name.as_deref(), &mut args);
    }
    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        located(module, result.binding.as_ref(), result.ty, None, &mut outputs);
    }

    let (inputs, varyings) = match kind {
        StageKind::Vertex => (vertex_inputs(&args)?, stage_varyings(&outputs)),
        StageKind::Fragment => {
            let writes_color = outputs
                .iter()
                .any(|o| o.location == 0 && float_components(o.ty) == Some(4));
            if !writes_color {
                return Err(format!(
                    "@fragment entry point `{}` must write a vec4<f32> to @location(0)",
                    entry.name
                ));
            }
            (Vec::new(), stage_varyings(&args))
        }
    };

    if let Some(name) = non_uniform_resource(module) {
        return Err(format!(
            "resource `{name}` is not a uniform buffer; only uniform bindings are supported"
        ));
    }

    Ok(StageInterface {
        kind,
        entry_point: entry.name.clone(),
        inputs,
        varyings,
        uniform_blocks: uniform_blocks(module),
    })
}

/// A `@location` binding found on an entry point argument or result.
struct Located<'a> {
    name: &'a str,
    location: u32,
    ty: &'a TypeInner,
    interpolation: Option<naga::Interpolation>,
}

// Struct-typed values carry their bindings on the members.
fn located<'a>(
    module: &'a Module,
    binding: Option<&'a Binding>,
    ty: naga::Handle<naga::Type>,
    name: Option<&'a str>,
    out: &mut Vec<Located<'a>>,
) {
    match binding {
        Some(Binding::Location { location, interpolation, .. }) => out.push(Located {
            name: name.unwrap_or("result"),
            location: *location,
            ty: &module.types[ty].inner,
            interpolation: *interpolation,
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    located(module, m.binding.as_ref(), m.ty, m.name.as_deref(), out);
                }
            }
        }
    }
}

fn vertex_inputs(args: &[Located<'_>]) -> Result<Vec<VertexInput>, String> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        let Some(components) = float_components(arg.ty) else {
            return Err(format!(
                "vertex input `{}` at @location({}) must be f32 or vecN<f32>; \
                 attribute arrays only carry floats",
                arg.name, arg.location
            ));
        };
        out.push(VertexInput {
            name: arg.name.to_owned(),
            location: arg.location,
            components,
        });
    }
    out.sort_by_key(|i| i.location);
    Ok(out)
}

fn stage_varyings(located: &[Located<'_>]) -> Vec<Varying> {
    let mut out: Vec<Varying> = located
        .iter()
        .filter_map(|l| {
            Some(Varying {
                name: l.name.to_owned(),
                location: l.location,
                ty: varying_type(l.ty)?,
                interpolation: l.interpolation.map(|i| match i {
                    naga::Interpolation::Perspective => Interpolation::Perspective,
                    naga::Interpolation::Linear => Interpolation::Linear,
                    naga::Interpolation::Flat => Interpolation::Flat,
                }),
            })
        })
        .collect();
    out.sort_by_key(|v| v.location);
    out
}

fn non_uniform_resource(module: &Module) -> Option<String> {
    module
        .global_variables
        .iter()
        .find(|(_, var)| var.binding.is_some() && !matches!(var.space, AddressSpace::Uniform))
        .map(|(_, var)| var.name.clone().unwrap_or_else(|| "<unnamed>".to_owned()))
}

fn uniform_blocks(module: &Module) -> Vec<UniformBlock> {
    let mut blocks = Vec::new();

    for (_, var) in module.global_variables.iter() {
        if !matches!(var.space, AddressSpace::Uniform) {
            continue;
        }
        let Some(rb) = &var.binding else { continue };

        let block = match &module.types[var.ty].inner {
            TypeInner::Struct { members, span } => UniformBlock {
                group: rb.group,
                binding: rb.binding,
                size: *span,
                fields: members
                    .iter()
                    .filter_map(|m| {
                        Some(UniformField {
                            name: m.name.clone()?,
                            offset: m.offset,
                            ty: uniform_type(&module.types[m.ty].inner),
                        })
                    })
                    .collect(),
            },
            other => {
                let ty = uniform_type(other);
                UniformBlock {
                    group: rb.group,
                    binding: rb.binding,
                    size: ty.components().map_or(0, |n| n as u32 * 4),
                    fields: var
                        .name
                        .clone()
                        .map(|name| UniformField { name, offset: 0, ty })
                        .into_iter()
                        .collect(),
                }
            }
        };
        blocks.push(block);
    }

    blocks.sort_by_key(|b| (b.group, b.binding));
    blocks
}

fn float_components(inner: &TypeInner) -> Option<u8> {
    match inner {
        TypeInner::Scalar(s) if s.kind == ScalarKind::Float && s.width == 4 => Some(1),
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
            Some(*size as u8)
        }
        _ => None,
    }
}

fn varying_type(inner: &TypeInner) -> Option<VaryingType> {
    let (scalar, components) = match inner {
        TypeInner::Scalar(s) => (s, 1),
        TypeInner::Vector { size, scalar } => (scalar, *size as u8),
        _ => return None,
    };
    if scalar.width != 4 {
        return None;
    }
    let scalar = match scalar.kind {
        ScalarKind::Float => ScalarType::F32,
        ScalarKind::Sint => ScalarType::I32,
        ScalarKind::Uint => ScalarType::U32,
        _ => return None,
    };
    Some(VaryingType { scalar, components })
}

fn uniform_type(inner: &TypeInner) -> UniformType {
    match float_components(inner) {
        Some(1) => UniformType::Float,
        Some(2) => UniformType::Vec2,
        Some(3) => UniformType::Vec3,
        Some(4) => UniformType::Vec4,
        _ => UniformType::Other,
    }
}
