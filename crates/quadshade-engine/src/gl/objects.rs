use std::collections::BTreeMap;

use crate::shader::{ProgramInterface, StageInterface};

use super::{
    AttribLayout, AttribLocation, BufferHandle, HandleTable, ProgramHandle, StageHandle, StageKind,
    UniformLocation,
};

/// Successfully compiled stage: its interface plus whatever the backend built.
pub struct CompiledShader<M> {
    pub iface: StageInterface,
    pub module: M,
}

pub struct StageObject<M> {
    pub kind: StageKind,
    pub source: String,
    pub compiled: Option<CompiledShader<M>>,
    pub log: String,
}

/// Linked program state. Uniform values are kept CPU-side, indexed by location.
pub struct LinkedState<R> {
    pub iface: ProgramInterface,
    pub resources: R,
    values: Vec<Option<Vec<f32>>>,
}

impl<R> LinkedState<R> {
    pub fn new(iface: ProgramInterface, resources: R) -> Self {
        Self {
            values: vec![None; iface.uniforms.len()],
            iface,
            resources,
        }
    }

    /// `(name, value)` of every uniform set so far, in location order.
    pub fn set_uniforms(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.iface
            .uniforms
            .iter()
            .zip(&self.values)
            .filter_map(|(u, v)| Some((u.name.as_str(), v.as_deref()?)))
    }

    /// Contents of uniform block `block`, padded to [`uniform_buffer_size`].
    /// Unset uniforms read as zero.
    pub fn block_bytes(&self, block: usize) -> Option<Vec<u8>> {
        let size = self.iface.uniform_blocks.get(block)?.size;
        let mut bytes = vec![0u8; uniform_buffer_size(size) as usize];

        for (uniform, value) in self.iface.uniforms.iter().zip(&self.values) {
            let Some(value) = value.as_deref() else { continue };
            if uniform.block != block {
                continue;
            }
            let src: &[u8] = bytemuck::cast_slice(value);
            let start = uniform.offset as usize;
            if let Some(dst) = bytes.get_mut(start..start + src.len()) {
                dst.copy_from_slice(src);
            }
        }
        Some(bytes)
    }
}

/// Uniform bindings are sized in 16-byte rows.
pub fn uniform_buffer_size(block_size: u32) -> u64 {
    (block_size.max(16) as u64).next_multiple_of(16)
}

pub struct ProgramObject<R> {
    pub attached: Vec<StageHandle>,
    pub linked: Option<LinkedState<R>>,
    pub log: String,
}

pub struct BufferObject<B> {
    pub data: Vec<f32>,
    /// Backend copy of `data`; absent until the first non-empty upload.
    pub resource: Option<B>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttribState {
    pub layout: Option<AttribLayout>,
    pub buffer: Option<BufferHandle>,
    pub enabled: bool,
}

/// Attribute array feeding one vertex input of the current program.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexBinding {
    pub location: u32,
    pub layout: AttribLayout,
    pub buffer: BufferHandle,
}

/// GL object model shared by the backends.
///
/// Owns stage, program and buffer objects plus the bind state (array buffer,
/// current program, attribute arrays, pending clear). Backends supply the
/// payloads: `M` per compiled stage, `R` per linked program, `B` per uploaded
/// buffer.
pub struct GlObjects<M, R, B> {
    stages: HandleTable<StageHandle, StageObject<M>>,
    programs: HandleTable<ProgramHandle, ProgramObject<R>>,
    buffers: HandleTable<BufferHandle, BufferObject<B>>,

    array_buffer: Option<BufferHandle>,
    current_program: Option<ProgramHandle>,
    attribs: BTreeMap<u32, AttribState>,
    pending_clear: Option<[f32; 4]>,
}

impl<M, R, B> Default for GlObjects<M, R, B> {
    fn default() -> Self {
        Self {
            stages: HandleTable::new(),
            programs: HandleTable::new(),
            buffers: HandleTable::new(),
            array_buffer: None,
            current_program: None,
            attribs: BTreeMap::new(),
            pending_clear: None,
        }
    }
}

impl<M, R, B> GlObjects<M, R, B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live object counts: `(stages, programs, buffers)`.
    pub fn live(&self) -> (usize, usize, usize) {
        (self.stages.len(), self.programs.len(), self.buffers.len())
    }

    // ── stages ────────────────────────────────────────────────────────────

    pub fn create_stage(&mut self, kind: StageKind) -> StageHandle {
        self.stages.insert(StageObject {
            kind,
            source: String::new(),
            compiled: None,
            log: String::new(),
        })
    }

    pub fn stage(&self, shader: StageHandle) -> Option<&StageObject<M>> {
        self.stages.get(shader)
    }

    pub fn set_source(&mut self, shader: StageHandle, source: &str) {
        if let Some(stage) = self.stages.get_mut(shader) {
            stage.source = source.to_owned();
        }
    }

    /// Stores a compile result. Returns whether it succeeded.
    pub fn finish_compile(
        &mut self,
        shader: StageHandle,
        result: Result<CompiledShader<M>, String>,
    ) -> bool {
        let Some(stage) = self.stages.get_mut(shader) else { return false };
        match result {
            Ok(compiled) => {
                stage.compiled = Some(compiled);
                stage.log.clear();
                true
            }
            Err(log) => {
                stage.compiled = None;
                stage.log = log;
                false
            }
        }
    }

    pub fn compile_status(&self, shader: StageHandle) -> bool {
        self.stages.get(shader).is_some_and(|s| s.compiled.is_some())
    }

    pub fn stage_log(&self, shader: StageHandle) -> String {
        self.stages.get(shader).map(|s| s.log.clone()).unwrap_or_default()
    }

    pub fn delete_stage(&mut self, shader: StageHandle) {
        self.stages.remove(shader);
    }

    // ── programs ──────────────────────────────────────────────────────────

    pub fn create_program(&mut self) -> ProgramHandle {
        self.programs.insert(ProgramObject {
            attached: Vec::new(),
            linked: None,
            log: String::new(),
        })
    }

    pub fn program_exists(&self, program: ProgramHandle) -> bool {
        self.programs.contains(program)
    }

    pub fn attach(&mut self, program: ProgramHandle, shader: StageHandle) {
        if !self.stages.contains(shader) {
            return;
        }
        if let Some(p) = self.programs.get_mut(program) {
            if !p.attached.contains(&shader) {
                p.attached.push(shader);
            }
        }
    }

    /// The compiled vertex and fragment stages attached to `program`, or the
    /// link log explaining why there is no such pair.
    pub fn link_inputs(
        &self,
        program: ProgramHandle,
    ) -> Result<(&CompiledShader<M>, &CompiledShader<M>), String> {
        let p = self
            .programs
            .get(program)
            .ok_or_else(|| format!("unknown program {program}"))?;

        let find = |kind: StageKind| {
            p.attached
                .iter()
                .filter_map(|h| self.stages.get(*h))
                .find(|s| s.kind == kind)
        };

        match (find(StageKind::Vertex), find(StageKind::Fragment)) {
            (Some(vs), Some(fs)) => match (&vs.compiled, &fs.compiled) {
                (Some(v), Some(f)) => Ok((v, f)),
                _ => Err("attached stage has not been compiled successfully".to_owned()),
            },
            (None, _) => Err("no vertex stage attached".to_owned()),
            (_, None) => Err("no fragment stage attached".to_owned()),
        }
    }

    /// Stores a link result. Returns whether it succeeded.
    pub fn finish_link(
        &mut self,
        program: ProgramHandle,
        result: Result<LinkedState<R>, String>,
    ) -> bool {
        let Some(p) = self.programs.get_mut(program) else { return false };
        match result {
            Ok(linked) => {
                p.linked = Some(linked);
                p.log.clear();
                true
            }
            Err(log) => {
                p.linked = None;
                p.log = log;
                false
            }
        }
    }

    pub fn link_status(&self, program: ProgramHandle) -> bool {
        self.linked(program).is_some()
    }

    pub fn program_log(&self, program: ProgramHandle) -> String {
        self.programs.get(program).map(|p| p.log.clone()).unwrap_or_default()
    }

    pub fn linked(&self, program: ProgramHandle) -> Option<&LinkedState<R>> {
        self.programs.get(program)?.linked.as_ref()
    }

    pub fn linked_mut(&mut self, program: ProgramHandle) -> Option<&mut LinkedState<R>> {
        self.programs.get_mut(program)?.linked.as_mut()
    }

    /// Makes `program` current. Unlinked programs are refused and leave the
    /// binding unchanged; returns whether the binding was applied.
    pub fn use_program(&mut self, program: Option<ProgramHandle>) -> bool {
        match program {
            Some(h) if !self.link_status(h) => false,
            _ => {
                self.current_program = program;
                true
            }
        }
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    pub fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(program).is_some() && self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    pub fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<AttribLocation> {
        let linked = self.linked(program)?;
        linked.iface.input(name).map(|i| AttribLocation(i.location))
    }

    pub fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let linked = self.linked(program)?;
        linked.iface.uniform(name).map(|(i, _)| UniformLocation(i as u32))
    }

    /// Writes a uniform of the current program.
    ///
    /// The value must have exactly as many floats as the uniform's type and
    /// must fit inside its block.
    pub fn set_uniform(&mut self, location: UniformLocation, value: &[f32]) -> Result<(), String> {
        let handle = self
            .current_program
            .ok_or("uniform set without a linked program in use")?;
        let linked = self
            .linked_mut(handle)
            .ok_or("uniform set without a linked program in use")?;

        let index = location.0 as usize;
        let uniform = linked
            .iface
            .uniforms
            .get(index)
            .ok_or_else(|| format!("unknown uniform location {}", location.0))?;

        if uniform.ty.components() != Some(value.len()) {
            return Err(format!(
                "uniform `{}` is {:?}, refusing a {}-float write",
                uniform.name,
                uniform.ty,
                value.len()
            ));
        }

        let end = uniform.offset as usize + value.len() * 4;
        let fits = linked
            .iface
            .uniform_blocks
            .get(uniform.block)
            .is_some_and(|b| end <= b.size as usize);
        if !fits {
            return Err(format!("uniform `{}` lies outside its block", uniform.name));
        }

        linked.values[index] = Some(value.to_vec());
        Ok(())
    }

    // ── buffers ───────────────────────────────────────────────────────────

    pub fn create_buffer(&mut self) -> BufferHandle {
        self.buffers.insert(BufferObject {
            data: Vec::new(),
            resource: None,
        })
    }

    pub fn buffer(&self, buffer: BufferHandle) -> Option<&BufferObject<B>> {
        self.buffers.get(buffer)
    }

    pub fn bind_array_buffer(&mut self, buffer: Option<BufferHandle>) {
        self.array_buffer = buffer.filter(|b| self.buffers.contains(*b));
    }

    pub fn array_buffer(&self) -> Option<BufferHandle> {
        self.array_buffer
    }

    /// Replaces the bound array buffer's contents and returns it so the
    /// backend can attach its own copy. `None` when nothing is bound.
    pub fn buffer_data(&mut self, data: &[f32]) -> Option<&mut BufferObject<B>> {
        let buffer = self.buffers.get_mut(self.array_buffer?)?;
        buffer.data = data.to_vec();
        buffer.resource = None;
        Some(buffer)
    }

    /// Frees `buffer` and detaches it from the array binding and every
    /// attribute array that sourced it.
    pub fn delete_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(buffer).is_none() {
            return;
        }
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        for a in self.attribs.values_mut() {
            if a.buffer == Some(buffer) {
                a.buffer = None;
            }
        }
    }

    // ── attribute arrays ──────────────────────────────────────────────────

    /// Sources `location` from the bound array buffer.
    pub fn vertex_attrib_pointer(
        &mut self,
        location: AttribLocation,
        layout: AttribLayout,
    ) -> Result<(), String> {
        if !(1..=4).contains(&layout.components) {
            return Err(format!("invalid component count {}", layout.components));
        }
        let buffer = self.array_buffer;
        let entry = self.attribs.entry(location.0).or_default();
        entry.layout = Some(layout);
        entry.buffer = buffer;
        Ok(())
    }

    pub fn enable_vertex_attrib(&mut self, location: AttribLocation) {
        self.attribs.entry(location.0).or_default().enabled = true;
    }

    /// Enabled attribute arrays with a layout, in location order.
    pub fn enabled_attribs(
        &self,
    ) -> impl Iterator<Item = (u32, AttribLayout, Option<BufferHandle>)> + '_ {
        self.attribs
            .iter()
            .filter(|(_, a)| a.enabled)
            .filter_map(|(loc, a)| Some((*loc, a.layout?, a.buffer)))
    }

    /// Attribute arrays feeding every input of `iface`, or the reason the
    /// draw cannot run.
    pub fn vertex_bindings(&self, iface: &ProgramInterface) -> Result<Vec<VertexBinding>, String> {
        let mut out = Vec::with_capacity(iface.inputs.len());
        for input in &iface.inputs {
            let state = self
                .attribs
                .get(&input.location)
                .filter(|a| a.enabled)
                .copied()
                .unwrap_or_default();

            let (Some(layout), Some(buffer)) = (state.layout, state.buffer) else {
                return Err(format!(
                    "vertex input `{}` (location {}) has no enabled attribute array",
                    input.name, input.location
                ));
            };
            if input.components != layout.components {
                return Err(format!(
                    "vertex input `{}` expects {} components, attribute provides {}",
                    input.name, input.components, layout.components
                ));
            }
            if !self.buffers.get(buffer).is_some_and(|b| !b.data.is_empty()) {
                return Err(format!("attribute buffer {buffer} holds no data"));
            }
            out.push(VertexBinding {
                location: input.location,
                layout,
                buffer,
            });
        }
        Ok(out)
    }

    // ── clear ─────────────────────────────────────────────────────────────

    pub fn clear(&mut self, color: [f32; 4]) {
        self.pending_clear = Some(color);
    }

    pub fn take_clear(&mut self) -> Option<[f32; 4]> {
        self.pending_clear.take()
    }
}
