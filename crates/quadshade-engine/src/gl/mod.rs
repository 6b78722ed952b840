//! GL-style graphics capability.
//!
//! The lifecycle manager talks to the GPU only through [`GraphicsContext`].
//! Objects are addressed by typed generational handles; backends keep the actual
//! objects in [`HandleTable`]s and never hand out references to them.
//! [`GlObjects`] is the object model both backends embed.

mod context;
mod handle;
mod objects;
mod types;

pub use context::GraphicsContext;
pub use objects::{
    uniform_buffer_size, AttribState, BufferObject, CompiledShader, GlObjects, LinkedState,
    ProgramObject, StageObject, VertexBinding,
};
pub use handle::{BufferHandle, HandleTable, ProgramHandle, RawHandle, StageHandle};
pub use types::{AttribLayout, AttribLocation, Primitive, StageKind, UniformLocation};
