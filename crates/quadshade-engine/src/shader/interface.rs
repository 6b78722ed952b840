use std::fmt;

use crate::gl::StageKind;

/// Scalar/vector type of a uniform field, as far as the uniform setters care.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    /// Matrices, integers, arrays... reflected but not settable.
    Other,
}

impl UniformType {
    /// Number of floats a setter writes, or `None` if not settable.
    #[inline]
    pub const fn components(self) -> Option<usize> {
        match self {
            UniformType::Float => Some(1),
            UniformType::Vec2 => Some(2),
            UniformType::Vec3 => Some(3),
            UniformType::Vec4 => Some(4),
            UniformType::Other => None,
        }
    }
}

/// One named, settable slot inside a uniform block.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformField {
    pub name: String,
    /// Byte offset inside the block.
    pub offset: u32,
    pub ty: UniformType,
}

/// `var<uniform>` binding declared by a stage.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    pub group: u32,
    pub binding: u32,
    /// Size in bytes, including trailing padding.
    pub size: u32,
    pub fields: Vec<UniformField>,
}

/// Per-vertex input of a vertex stage. Always `f32` or `vecN<f32>`.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
    /// Floats per vertex (1..=4).
    pub components: u8,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScalarType {
    F32,
    I32,
    U32,
}

impl ScalarType {
    pub const fn label(self) -> &'static str {
        match self {
            ScalarType::F32 => "f32",
            ScalarType::I32 => "i32",
            ScalarType::U32 => "u32",
        }
    }
}

/// Type of a value passed between stages.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VaryingType {
    pub scalar: ScalarType,
    /// 1 for a scalar.
    pub components: u8,
}

impl fmt::Display for VaryingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.components {
            1 => f.write_str(self.scalar.label()),
            n => write!(f, "vec{n}<{}>", self.scalar.label()),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Interpolation {
    Perspective,
    Linear,
    Flat,
}

/// User-defined `@location` value on the vertex→fragment boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Varying {
    pub name: String,
    pub location: u32,
    pub ty: VaryingType,
    pub interpolation: Option<Interpolation>,
}

impl fmt::Display for Varying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` (@location({}) {})", self.name, self.location, self.ty)
    }
}

/// Reflected interface of one compiled stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageInterface {
    pub kind: StageKind,
    pub entry_point: String,
    /// Always empty for fragment stages.
    pub inputs: Vec<VertexInput>,
    /// Outputs of a vertex stage, inputs of a fragment stage.
    pub varyings: Vec<Varying>,
    pub uniform_blocks: Vec<UniformBlock>,
}

/// Uniform resolved on a linked program. Its index in
/// [`ProgramInterface::uniforms`] is the backend's `UniformLocation`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedUniform {
    pub name: String,
    /// Index into [`ProgramInterface::uniform_blocks`].
    pub block: usize,
    pub offset: u32,
    pub ty: UniformType,
}

/// Reflected interface of a linked program.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub inputs: Vec<VertexInput>,
    /// Union of both stages' blocks, sorted by binding.
    pub uniform_blocks: Vec<UniformBlock>,
    pub uniforms: Vec<ResolvedUniform>,
}

impl ProgramInterface {
    /// Links two stage interfaces.
    ///
    /// Fails when the stage kinds are wrong, a fragment input is not fed by a
    /// vertex output of the same type, a block lives outside group 0, the stages
    /// disagree on a shared binding, or a uniform name is ambiguous.
    pub fn link(vertex: &StageInterface, fragment: &StageInterface) -> Result<Self, String> {
        if vertex.kind != StageKind::Vertex {
            return Err(format!(
                "expected a vertex stage in the vertex slot, found a {} stage",
                vertex.kind
            ));
        }
        if fragment.kind != StageKind::Fragment {
            return Err(format!(
                "expected a fragment stage in the fragment slot, found a {} stage",
                fragment.kind
            ));
        }

        for input in &fragment.varyings {
            let Some(output) = vertex.varyings.iter().find(|o| o.location == input.location) else {
                return Err(format!("fragment input {input} has no matching vertex output"));
            };
            if output.ty != input.ty {
                return Err(format!(
                    "fragment input {input} does not match vertex output {output}"
                ));
            }
            if output.interpolation != input.interpolation {
                return Err(format!(
                    "fragment input {input} is interpolated {:?}, vertex output {output} {:?}",
                    input.interpolation, output.interpolation
                ));
            }
        }

        let mut blocks: Vec<UniformBlock> = Vec::new();
        for block in vertex.uniform_blocks.iter().chain(&fragment.uniform_blocks) {
            if block.group != 0 {
                return Err(format!(
                    "uniform block @group({}) @binding({}): only bind group 0 is supported",
                    block.group, block.binding
                ));
            }

            match blocks.iter().find(|b| b.binding == block.binding) {
                Some(existing) if existing != block => {
                    return Err(format!(
                        "uniform block @group(0) @binding({}) is declared with different layouts \
                         in the vertex and fragment stages",
                        block.binding
                    ));
                }
                Some(_) => {}
                None => blocks.push(block.clone()),
            }
        }
        blocks.sort_by_key(|b| b.binding);

        let mut uniforms: Vec<ResolvedUniform> = Vec::new();
        for (block_index, block) in blocks.iter().enumerate() {
            for field in &block.fields {
                if uniforms.iter().any(|u| u.name == field.name) {
                    return Err(format!(
                        "uniform `{}` is declared in more than one uniform block",
                        field.name
                    ));
                }
                uniforms.push(ResolvedUniform {
                    name: field.name.clone(),
                    block: block_index,
                    offset: field.offset,
                    ty: field.ty,
                });
            }
        }

        Ok(Self {
            vertex_entry: vertex.entry_point.clone(),
            fragment_entry: fragment.entry_point.clone(),
            inputs: vertex.inputs.clone(),
            uniform_blocks: blocks,
            uniforms,
        })
    }

    pub fn input(&self, name: &str) -> Option<&VertexInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Returns `(location index, uniform)`.
    pub fn uniform(&self, name: &str) -> Option<(usize, &ResolvedUniform)> {
        self.uniforms.iter().enumerate().find(|(_, u)| u.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(binding: u32, fields: &[(&str, u32, UniformType)]) -> UniformBlock {
        UniformBlock {
            group: 0,
            binding,
            size: 32,
            fields: fields
                .iter()
                .map(|(n, o, t)| UniformField { name: n.to_string(), offset: *o, ty: *t })
                .collect(),
        }
    }

    fn stage(kind: StageKind, blocks: Vec<UniformBlock>) -> StageInterface {
        StageInterface {
            kind,
            entry_point: format!("{}_main", kind.label()),
            inputs: if kind == StageKind::Vertex {
                vec![VertexInput { name: "position".into(), location: 0, components: 2 }]
            } else {
                Vec::new()
            },
            varyings: Vec::new(),
            uniform_blocks: blocks,
        }
    }

    // ── link ──────────────────────────────────────────────────────────────

    #[test]
    fn link_merges_shared_block_once() {
        let b = block(0, &[("color", 0, UniformType::Vec3), ("resolution", 16, UniformType::Vec2)]);
        let vs = stage(StageKind::Vertex, vec![b.clone()]);
        let fs = stage(StageKind::Fragment, vec![b]);

        let p = ProgramInterface::link(&vs, &fs).unwrap();
        assert_eq!(p.uniform_blocks.len(), 1);
        assert_eq!(p.uniforms.len(), 2);
        assert_eq!(p.uniform("resolution").unwrap().0, 1);
        assert_eq!(p.input("position").unwrap().location, 0);
        assert_eq!(p.vertex_entry, "vertex_main");
    }

    #[test]
    fn link_rejects_swapped_stage_kinds() {
        let vs = stage(StageKind::Vertex, vec![]);
        let fs = stage(StageKind::Fragment, vec![]);
        assert!(ProgramInterface::link(&fs, &vs).is_err());
    }

    #[test]
    fn link_rejects_conflicting_layouts() {
        let vs = stage(StageKind::Vertex, vec![block(0, &[("color", 0, UniformType::Vec3)])]);
        let fs = stage(StageKind::Fragment, vec![block(0, &[("color", 0, UniformType::Vec4)])]);
        let err = ProgramInterface::link(&vs, &fs).unwrap_err();
        assert!(err.contains("different layouts"), "{err}");
    }

    #[test]
    fn link_rejects_nonzero_group() {
        let mut b = block(0, &[("color", 0, UniformType::Vec3)]);
        b.group = 1;
        let vs = stage(StageKind::Vertex, vec![]);
        let fs = stage(StageKind::Fragment, vec![b]);
        assert!(ProgramInterface::link(&vs, &fs).is_err());
    }

    #[test]
    fn link_rejects_ambiguous_uniform_name() {
        let vs = stage(StageKind::Vertex, vec![block(0, &[("color", 0, UniformType::Vec3)])]);
        let fs = stage(StageKind::Fragment, vec![block(1, &[("color", 0, UniformType::Vec3)])]);
        let err = ProgramInterface::link(&vs, &fs).unwrap_err();
        assert!(err.contains("more than one"), "{err}");
    }

    // ── varyings ──────────────────────────────────────────────────────────

    fn varying(name: &str, location: u32, scalar: ScalarType, components: u8) -> Varying {
        Varying {
            name: name.into(),
            location,
            ty: VaryingType { scalar, components },
            interpolation: Some(Interpolation::Perspective),
        }
    }

    #[test]
    fn fragment_input_without_vertex_output_fails() {
        let vs = stage(StageKind::Vertex, vec![]);
        let mut fs = stage(StageKind::Fragment, vec![]);
        fs.varyings.push(varying("uv", 0, ScalarType::F32, 2));

        let err = ProgramInterface::link(&vs, &fs).unwrap_err();
        assert_eq!(
            err,
            "fragment input `uv` (@location(0) vec2<f32>) has no matching vertex output"
        );
    }

    #[test]
    fn varying_type_mismatch_fails() {
        let mut vs = stage(StageKind::Vertex, vec![]);
        vs.varyings.push(varying("uv", 0, ScalarType::F32, 3));
        let mut fs = stage(StageKind::Fragment, vec![]);
        fs.varyings.push(varying("uv", 0, ScalarType::F32, 2));

        let err = ProgramInterface::link(&vs, &fs).unwrap_err();
        assert!(err.contains("vec3<f32>"), "{err}");
    }

    #[test]
    fn varying_interpolation_mismatch_fails() {
        let mut vs = stage(StageKind::Vertex, vec![]);
        vs.varyings.push(varying("id", 1, ScalarType::U32, 1));
        let mut fs = stage(StageKind::Fragment, vec![]);
        let mut flat = varying("id", 1, ScalarType::U32, 1);
        flat.interpolation = Some(Interpolation::Flat);
        fs.varyings.push(flat);

        assert!(ProgramInterface::link(&vs, &fs).is_err());
    }

    #[test]
    fn unread_vertex_outputs_are_allowed() {
        let mut vs = stage(StageKind::Vertex, vec![]);
        vs.varyings.push(varying("uv", 0, ScalarType::F32, 2));
        vs.varyings.push(varying("tint", 1, ScalarType::F32, 4));
        let mut fs = stage(StageKind::Fragment, vec![]);
        fs.varyings.push(varying("tint", 1, ScalarType::F32, 4));

        assert!(ProgramInterface::link(&vs, &fs).is_ok());
    }
}
