//! Shader front end and reflection.
//!
//! Backends do not parse shader text themselves. They hand it to a
//! [`ShaderValidator`], which either rejects it with a human-readable log or
//! returns the stage's reflected interface. Linking is done on interfaces.

mod interface;
mod wgsl;

pub use interface::{
    Interpolation, ProgramInterface, ResolvedUniform, ScalarType, StageInterface, UniformBlock,
    UniformField, UniformType, Varying, VaryingType, VertexInput,
};
pub use wgsl::{reflect, WgslValidator};

use crate::gl::StageKind;

/// Built-in pass-through vertex stage (`vs_main`, `@location(0) position`).
pub const QUAD_VERTEX_WGSL: &str = include_str!("builtin/quad.vert.wgsl");

/// Built-in fragment stage reading `color` and `resolution` from group 0.
pub const QUAD_FRAGMENT_WGSL: &str = include_str!("builtin/quad.frag.wgsl");

/// Compile/link rules used by a backend.
pub trait ShaderValidator {
    /// Validates one stage. `Err` carries the compile log.
    fn compile(&self, kind: StageKind, source: &str) -> Result<StageInterface, String>;

    /// Links two compiled stages. `Err` carries the link log.
    fn link(
        &self,
        vertex: &StageInterface,
        fragment: &StageInterface,
    ) -> Result<ProgramInterface, String> {
        ProgramInterface::link(vertex, fragment)
    }
}

impl<V: ShaderValidator + ?Sized> ShaderValidator for &V {
    fn compile(&self, kind: StageKind, source: &str) -> Result<StageInterface, String> {
        (**self).compile(kind, source)
    }

    fn link(
        &self,
        vertex: &StageInterface,
        fragment: &StageInterface,
    ) -> Result<ProgramInterface, String> {
        (**self).link(vertex, fragment)
    }
}
