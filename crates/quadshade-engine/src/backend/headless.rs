use crate::gl::{
    AttribLayout, AttribLocation, BufferHandle, CompiledShader, GlObjects, GraphicsContext,
    LinkedState, Primitive, ProgramHandle, StageHandle, StageKind, UniformLocation,
};
use crate::shader::{ShaderValidator, WgslValidator};

/// One command issued against a [`HeadlessContext`], in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateShader { kind: StageKind, shader: Option<StageHandle> },
    ShaderSource { shader: StageHandle, len: usize },
    CompileShader { shader: StageHandle, ok: bool },
    DeleteShader(StageHandle),
    CreateProgram(Option<ProgramHandle>),
    AttachShader { program: ProgramHandle, shader: StageHandle },
    LinkProgram { program: ProgramHandle, ok: bool },
    UseProgram(Option<ProgramHandle>),
    DeleteProgram(ProgramHandle),
    CreateBuffer(Option<BufferHandle>),
    BindArrayBuffer(Option<BufferHandle>),
    BufferData { buffer: Option<BufferHandle>, floats: usize },
    DeleteBuffer(BufferHandle),
    VertexAttribPointer { location: AttribLocation, layout: AttribLayout },
    EnableVertexAttrib(AttribLocation),
    Uniform3f { location: UniformLocation, value: [f32; 3] },
    Uniform2f { location: UniformLocation, value: [f32; 2] },
    Clear([f32; 4]),
    DrawArrays { primitive: Primitive, first: u32, count: u32 },
}

/// Bound attribute state as seen by a draw.
#[derive(Debug, Clone, PartialEq)]
pub struct AttribSnapshot {
    pub location: u32,
    pub layout: AttribLayout,
    pub buffer: Option<BufferHandle>,
    /// Contents of `buffer` at draw time.
    pub data: Vec<f32>,
}

/// Everything a draw call consumed. Two equal snapshots produce identical images.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawSnapshot {
    pub program: ProgramHandle,
    pub primitive: Primitive,
    pub first: u32,
    pub count: u32,
    pub clear_color: Option<[f32; 4]>,
    /// `(name, value)` for every uniform that has been set, in location order.
    pub uniforms: Vec<(String, Vec<f32>)>,
    pub attributes: Vec<AttribSnapshot>,
}

impl DrawSnapshot {
    pub fn uniform(&self, name: &str) -> Option<&[f32]> {
        self.uniforms
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }
}

/// CPU-only graphics context.
///
/// Tracks objects exactly like a GL driver would, runs `V` for compile/link,
/// and records every command. Nothing is rasterized; draws are captured as
/// [`DrawSnapshot`]s instead.
pub struct HeadlessContext<V = WgslValidator> {
    validator: V,
    objects: GlObjects<(), (), ()>,

    lost: bool,
    calls: Vec<GlCall>,
    draws: Vec<DrawSnapshot>,
}

impl HeadlessContext<WgslValidator> {
    /// Headless context validating WGSL with naga.
    pub fn new() -> Self {
        Self::with_validator(WgslValidator::new())
    }
}

impl Default for HeadlessContext<WgslValidator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: ShaderValidator> HeadlessContext<V> {
    pub fn with_validator(validator: V) -> Self {
        Self {
            validator,
            objects: GlObjects::new(),
            lost: false,
            calls: Vec::new(),
            draws: Vec::new(),
        }
    }

    /// Simulates context loss: every `create_*` yields `None` while set.
    pub fn set_lost(&mut self, lost: bool) {
        self.lost = lost;
    }

    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    /// Draws that actually executed (a linked program was current).
    pub fn draws(&self) -> &[DrawSnapshot] {
        &self.draws
    }

    pub fn clear_log(&mut self) {
        self.calls.clear();
        self.draws.clear();
    }

    pub fn compile_attempts(&self, kind: StageKind) -> usize {
        self.calls
            .iter()
            .filter(|c| match c {
                GlCall::CompileShader { shader, .. } => self.kind_of_compiled(*shader) == Some(kind),
                _ => false,
            })
            .count()
    }

    pub fn link_attempts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, GlCall::LinkProgram { .. }))
            .count()
    }

    /// Live object counts: `(stages, programs, buffers)`.
    pub fn live_objects(&self) -> (usize, usize, usize) {
        self.objects.live()
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.objects.current_program()
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[f32]> {
        self.objects.buffer(buffer).map(|b| b.data.as_slice())
    }

    // Stages may already be deleted when the log is inspected; fall back to
    // the matching CreateShader record.
    fn kind_of_compiled(&self, shader: StageHandle) -> Option<StageKind> {
        self.calls.iter().find_map(|c| match c {
            GlCall::CreateShader { kind, shader: Some(s) } if *s == shader => Some(*kind),
            _ => None,
        })
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &[f32]) {
        if let Err(reason) = self.objects.set_uniform(location, value) {
            log::debug!("headless: {reason}");
        }
    }
}

impl<V: ShaderValidator> GraphicsContext for HeadlessContext<V> {
    fn create_shader(&mut self, kind: StageKind) -> Option<StageHandle> {
        let shader = (!self.lost).then(|| self.objects.create_stage(kind));
        self.calls.push(GlCall::CreateShader { kind, shader });
        shader
    }

    fn shader_source(&mut self, shader: StageHandle, source: &str) {
        self.calls.push(GlCall::ShaderSource { shader, len: source.len() });
        self.objects.set_source(shader, source);
    }

    fn compile_shader(&mut self, shader: StageHandle) {
        let Some(stage) = self.objects.stage(shader) else {
            log::debug!("headless: compile of unknown {shader}");
            return;
        };

        let result = self
            .validator
            .compile(stage.kind, &stage.source)
            .map(|iface| CompiledShader { iface, module: () });
        let ok = self.objects.finish_compile(shader, result);
        self.calls.push(GlCall::CompileShader { shader, ok });
    }

    fn shader_compile_status(&self, shader: StageHandle) -> bool {
        self.objects.compile_status(shader)
    }

    fn shader_info_log(&self, shader: StageHandle) -> String {
        self.objects.stage_log(shader)
    }

    fn delete_shader(&mut self, shader: StageHandle) {
        self.calls.push(GlCall::DeleteShader(shader));
        self.objects.delete_stage(shader);
    }

    fn create_program(&mut self) -> Option<ProgramHandle> {
        let program = (!self.lost).then(|| self.objects.create_program());
        self.calls.push(GlCall::CreateProgram(program));
        program
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: StageHandle) {
        self.calls.push(GlCall::AttachShader { program, shader });
        self.objects.attach(program, shader);
    }

    fn link_program(&mut self, program: ProgramHandle) {
        if !self.objects.program_exists(program) {
            log::debug!("headless: link of unknown {program}");
            return;
        }

        let result = self
            .objects
            .link_inputs(program)
            .and_then(|(v, f)| self.validator.link(&v.iface, &f.iface))
            .map(|iface| LinkedState::new(iface, ()));
        let ok = self.objects.finish_link(program, result);
        self.calls.push(GlCall::LinkProgram { program, ok });
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        self.objects.link_status(program)
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        self.objects.program_log(program)
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.calls.push(GlCall::UseProgram(program));
        if !self.objects.use_program(program) {
            log::debug!("headless: use of unlinked program ignored");
        }
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.calls.push(GlCall::DeleteProgram(program));
        self.objects.delete_program(program);
    }

    fn create_buffer(&mut self) -> Option<BufferHandle> {
        let buffer = (!self.lost).then(|| self.objects.create_buffer());
        self.calls.push(GlCall::CreateBuffer(buffer));
        buffer
    }

    fn bind_array_buffer(&mut self, buffer: Option<BufferHandle>) {
        self.calls.push(GlCall::BindArrayBuffer(buffer));
        self.objects.bind_array_buffer(buffer);
    }

    fn buffer_data_static(&mut self, data: &[f32]) {
        self.calls.push(GlCall::BufferData {
            buffer: self.objects.array_buffer(),
            floats: data.len(),
        });
        if self.objects.buffer_data(data).is_none() {
            log::debug!("headless: buffer data without a bound array buffer");
        }
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.calls.push(GlCall::DeleteBuffer(buffer));
        self.objects.delete_buffer(buffer);
    }

    fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<AttribLocation> {
        self.objects.attrib_location(program, name)
    }

    fn vertex_attrib_pointer(&mut self, location: AttribLocation, layout: AttribLayout) {
        self.calls.push(GlCall::VertexAttribPointer { location, layout });
        if let Err(reason) = self.objects.vertex_attrib_pointer(location, layout) {
            log::debug!("headless: {reason}");
        }
    }

    fn enable_vertex_attrib(&mut self, location: AttribLocation) {
        self.calls.push(GlCall::EnableVertexAttrib(location));
        self.objects.enable_vertex_attrib(location);
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.objects.uniform_location(program, name)
    }

    fn uniform_3f(&mut self, location: UniformLocation, value: [f32; 3]) {
        self.calls.push(GlCall::Uniform3f { location, value });
        self.set_uniform(location, &value);
    }

    fn uniform_2f(&mut self, location: UniformLocation, value: [f32; 2]) {
        self.calls.push(GlCall::Uniform2f { location, value });
        self.set_uniform(location, &value);
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.calls.push(GlCall::Clear(color));
        self.objects.clear(color);
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        self.calls.push(GlCall::DrawArrays { primitive, first, count });

        let Some(program) = self.objects.current_program() else {
            log::debug!("headless: draw without a current program");
            return;
        };
        let Some(linked) = self.objects.linked(program) else { return };

        let uniforms = linked
            .set_uniforms()
            .map(|(name, value)| (name.to_owned(), value.to_vec()))
            .collect();

        let attributes = self
            .objects
            .enabled_attribs()
            .map(|(location, layout, buffer)| AttribSnapshot {
                location,
                layout,
                buffer,
                data: buffer
                    .and_then(|b| self.objects.buffer(b))
                    .map(|b| b.data.clone())
                    .unwrap_or_default(),
            })
            .collect();

        let clear_color = self.objects.take_clear();
        self.draws.push(DrawSnapshot {
            program,
            primitive,
            first,
            count,
            clear_color,
            uniforms,
            attributes,
        });
    }
}
