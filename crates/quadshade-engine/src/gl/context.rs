use super::{
    AttribLayout, AttribLocation, BufferHandle, Primitive, ProgramHandle, StageHandle, StageKind,
    UniformLocation,
};

/// GL-style drawing capability.
///
/// Every method is synchronous and must be called from the thread that owns the
/// context. Operations on stale or unknown handles are ignored, matching GL's
/// "generate an error, change nothing" behavior; backends log them at debug level.
pub trait GraphicsContext {
    // ── shader stages ─────────────────────────────────────────────────────

    /// Allocates an empty stage object. `None` means the backend is out of objects
    /// or the context is lost.
    fn create_shader(&mut self, kind: StageKind) -> Option<StageHandle>;

    /// Replaces the stage's source text.
    fn shader_source(&mut self, shader: StageHandle, source: &str);

    fn compile_shader(&mut self, shader: StageHandle);

    /// Result of the last `compile_shader`. `false` before any compile.
    fn shader_compile_status(&self, shader: StageHandle) -> bool;

    /// Diagnostics of the last `compile_shader`.
    fn shader_info_log(&self, shader: StageHandle) -> String;

    fn delete_shader(&mut self, shader: StageHandle);

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&mut self) -> Option<ProgramHandle>;

    fn attach_shader(&mut self, program: ProgramHandle, shader: StageHandle);

    fn link_program(&mut self, program: ProgramHandle);

    fn program_link_status(&self, program: ProgramHandle) -> bool;

    fn program_info_log(&self, program: ProgramHandle) -> String;

    /// Makes `program` current for attribute, uniform and draw calls.
    /// `None` unbinds.
    fn use_program(&mut self, program: Option<ProgramHandle>);

    fn delete_program(&mut self, program: ProgramHandle);

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Option<BufferHandle>;

    /// Binds the array buffer used by `buffer_data_static` and attribute pointers.
    fn bind_array_buffer(&mut self, buffer: Option<BufferHandle>);

    /// Uploads `data` into the bound array buffer with static-draw usage.
    fn buffer_data_static(&mut self, data: &[f32]);

    fn delete_buffer(&mut self, buffer: BufferHandle);

    // ── attributes & uniforms ─────────────────────────────────────────────

    fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<AttribLocation>;

    /// Sources `location` from the currently bound array buffer.
    fn vertex_attrib_pointer(&mut self, location: AttribLocation, layout: AttribLayout);

    fn enable_vertex_attrib(&mut self, location: AttribLocation);

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Sets a `vec3<f32>` uniform on the current program.
    fn uniform_3f(&mut self, location: UniformLocation, value: [f32; 3]);

    /// Sets a `vec2<f32>` uniform on the current program.
    fn uniform_2f(&mut self, location: UniformLocation, value: [f32; 2]);

    // ── drawing ───────────────────────────────────────────────────────────

    /// Clears the color buffer to `color` (straight RGBA).
    fn clear(&mut self, color: [f32; 4]);

    /// Draws `count` vertices starting at `first` with the current program.
    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32);
}
