use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::device::Gpu;
use crate::gl::{
    uniform_buffer_size, AttribLayout, AttribLocation, BufferHandle, CompiledShader, GlObjects,
    GraphicsContext, LinkedState, Primitive, ProgramHandle, StageHandle, StageKind,
    UniformLocation, VertexBinding,
};
use crate::shader::{ProgramInterface, ShaderValidator, WgslValidator};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PipelineKey {
    primitive: Primitive,
    attributes: Vec<(u32, AttribLayout)>,
}

impl PipelineKey {
    /// Tightly packed arrays for every input, drawn as triangles.
    fn packed(iface: &ProgramInterface) -> Self {
        Self {
            primitive: Primitive::Triangles,
            attributes: iface
                .inputs
                .iter()
                .map(|i| (i.location, AttribLayout::packed(i.components)))
                .collect(),
        }
    }
}

/// GPU objects owned by a linked program.
struct ProgramResources {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    /// One per uniform block, in block order.
    uniform_buffers: Vec<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
    pipelines: Vec<(PipelineKey, wgpu::RenderPipeline)>,
}

type Objects = GlObjects<wgpu::ShaderModule, ProgramResources, wgpu::Buffer>;

/// Window-backed graphics context.
///
/// Stage text is validated with naga before a `wgpu::ShaderModule` is created,
/// so shader errors surface as compile logs. Module and pipeline creation run
/// inside a validation error scope; anything the device still rejects becomes
/// the compile or link log instead of an uncaptured error.
///
/// Linking builds the program's uniform buffers, bind group and a pipeline
/// for tightly packed inputs. Pipelines for other attribute layouts or
/// topologies are built on first draw and cached on the program.
///
/// `clear` is deferred; the next `draw_arrays` encodes it as the load op of a
/// single render pass on a freshly acquired frame, which is then presented.
pub struct WgpuContext {
    gpu: Gpu,
    validator: WgslValidator,
    objects: Objects,
    fatal: bool,
}

impl WgpuContext {
    pub fn new(gpu: Gpu) -> Self {
        Self::with_validator(gpu, WgslValidator::new())
    }

    pub fn with_validator(gpu: Gpu, validator: WgslValidator) -> Self {
        Self {
            gpu,
            validator,
            objects: GlObjects::new(),
            fatal: false,
        }
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
    }

    /// Set once the surface reported an unrecoverable error. All allocations
    /// fail afterwards, like a lost GL context.
    pub fn is_lost(&self) -> bool {
        self.fatal
    }

    fn link(&self, program: ProgramHandle) -> Result<LinkedState<ProgramResources>, String> {
        let (vertex, fragment) = self.objects.link_inputs(program)?;
        let iface = self.validator.link(&vertex.iface, &fragment.iface)?;

        let device = self.gpu.device();
        let mut resources = validated(device, || {
            link_resources(device, &iface, vertex.module.clone(), fragment.module.clone())
        })?;

        let key = PipelineKey::packed(&iface);
        let format = self.gpu.surface_format();
        let pipeline = validated(device, || build_pipeline(device, &iface, &resources, &key, format))?;
        resources.pipelines.push((key, pipeline));

        Ok(LinkedState::new(iface, resources))
    }

    /// Uploads the current program's uniforms and returns the index of a
    /// pipeline matching the bound attribute arrays.
    fn prepare_draw(
        &mut self,
        program: ProgramHandle,
        primitive: Primitive,
    ) -> Result<(usize, Vec<VertexBinding>), String> {
        let linked = self
            .objects
            .linked(program)
            .ok_or("current program is not linked")?;
        let bindings = self.objects.vertex_bindings(&linked.iface)?;

        let queue = self.gpu.queue();
        for (block, buffer) in linked.resources.uniform_buffers.iter().enumerate() {
            if let Some(bytes) = linked.block_bytes(block) {
                queue.write_buffer(buffer, 0, &bytes);
            }
        }

        let key = PipelineKey {
            primitive,
            attributes: bindings.iter().map(|b| (b.location, b.layout)).collect(),
        };

        let format = self.gpu.surface_format();
        let device = self.gpu.device();
        let linked = self
            .objects
            .linked_mut(program)
            .ok_or("current program is not linked")?;

        if let Some(i) = linked.resources.pipelines.iter().position(|(k, _)| *k == key) {
            return Ok((i, bindings));
        }
        let pipeline = validated(device, || {
            build_pipeline(device, &linked.iface, &linked.resources, &key, format)
        })?;
        linked.resources.pipelines.push((key, pipeline));
        Ok((linked.resources.pipelines.len() - 1, bindings))
    }

    /// Encodes one pass into a fresh frame and presents it.
    fn render(&mut self, clear: Option<[f32; 4]>, draw: Option<(Primitive, u32, u32)>) {
        let mut prepared = None;

        if let Some((primitive, first, count)) = draw {
            match self.objects.current_program() {
                None => log::debug!("wgpu: draw without a current program"),
                Some(program) => match self.prepare_draw(program, primitive) {
                    Ok((pipeline, bindings)) => {
                        prepared = Some((program, pipeline, bindings, first..first + count));
                    }
                    Err(reason) => log::warn!("wgpu: draw skipped: {reason}"),
                },
            }
        }

        if prepared.is_none() && clear.is_none() {
            return;
        }

        let mut frame = match self.gpu.acquire_frame() {
            Ok(frame) => frame,
            Err(err) if err.is_fatal() => {
                log::error!("wgpu: {err}; context is lost");
                self.fatal = true;
                return;
            }
            Err(err) => {
                log::debug!("wgpu: {err}");
                return;
            }
        };

        {
            let mut pass = frame.pass(clear);

            let program = prepared.as_ref().and_then(|(program, index, bindings, range)| {
                let linked = self.objects.linked(*program)?;
                let (_, pipeline) = linked.resources.pipelines.get(*index)?;
                Some((linked, pipeline, bindings, range.clone()))
            });

            if let Some((linked, pipeline, bindings, range)) = program {
                pass.set_pipeline(pipeline);
                if let Some(bind_group) = &linked.resources.bind_group {
                    pass.set_bind_group(0, bind_group, &[]);
                }
                for (slot, binding) in bindings.iter().enumerate() {
                    let buffer = self
                        .objects
                        .buffer(binding.buffer)
                        .and_then(|b| b.resource.as_ref());
                    if let Some(buffer) = buffer {
                        pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                    }
                }
                pass.draw(range, 0..1);
            }
        }

        self.gpu.present(frame);
    }
}

/// Runs `create` inside a validation error scope.
fn validated<T>(device: &wgpu::Device, create: impl FnOnce() -> T) -> Result<T, String> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(scope.pop()) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}

fn vertex_format(components: u8) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

fn topology(primitive: Primitive) -> wgpu::PrimitiveTopology {
    match primitive {
        Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
        Primitive::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        Primitive::Lines => wgpu::PrimitiveTopology::LineList,
        Primitive::Points => wgpu::PrimitiveTopology::PointList,
    }
}

/// One vertex attribute per buffer slot, in location order.
fn vertex_attributes(key: &PipelineKey) -> Vec<[wgpu::VertexAttribute; 1]> {
    key.attributes
        .iter()
        .map(|(location, layout)| {
            [wgpu::VertexAttribute {
                format: vertex_format(layout.components),
                offset: layout.offset as u64,
                shader_location: *location,
            }]
        })
        .collect()
}

fn build_pipeline(
    device: &wgpu::Device,
    iface: &ProgramInterface,
    resources: &ProgramResources,
    key: &PipelineKey,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let attributes = vertex_attributes(key);
    let buffers: Vec<wgpu::VertexBufferLayout> = key
        .attributes
        .iter()
        .zip(&attributes)
        .map(|((_, layout), attrs)| wgpu::VertexBufferLayout {
            array_stride: layout.effective_stride() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attrs,
        })
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("quadshade pipeline"),
        layout: Some(&resources.layout),
        vertex: wgpu::VertexState {
            module: &resources.vertex,
            entry_point: Some(iface.vertex_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: &resources.fragment,
            entry_point: Some(iface.fragment_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: topology(key.primitive),
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Allocates uniform buffers and the group 0 bind group for `iface`.
fn link_resources(
    device: &wgpu::Device,
    iface: &ProgramInterface,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
) -> ProgramResources {
    let uniform_buffers: Vec<wgpu::Buffer> = iface
        .uniform_blocks
        .iter()
        .map(|b| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("quadshade uniforms"),
                size: uniform_buffer_size(b.size),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })
        .collect();

    if uniform_buffers.is_empty() {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quadshade pipeline layout"),
            bind_group_layouts: &[],
            immediate_size: 0,
        });
        return ProgramResources {
            vertex,
            fragment,
            layout,
            uniform_buffers,
            bind_group: None,
            pipelines: Vec::new(),
        };
    }

    let entries: Vec<wgpu::BindGroupLayoutEntry> = iface
        .uniform_blocks
        .iter()
        .map(|b| wgpu::BindGroupLayoutEntry {
            binding: b.binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect();

    let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("quadshade uniform layout"),
        entries: &entries,
    });

    let bind_entries: Vec<wgpu::BindGroupEntry> = iface
        .uniform_blocks
        .iter()
        .zip(&uniform_buffers)
        .map(|(b, buffer)| wgpu::BindGroupEntry {
            binding: b.binding,
            resource: buffer.as_entire_binding(),
        })
        .collect();

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("quadshade uniforms"),
        layout: &bgl,
        entries: &bind_entries,
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("quadshade pipeline layout"),
        bind_group_layouts: &[&bgl],
        immediate_size: 0,
    });

    ProgramResources {
        vertex,
        fragment,
        layout,
        uniform_buffers,
        bind_group: Some(bind_group),
        pipelines: Vec::new(),
    }
}

impl GraphicsContext for WgpuContext {
    fn create_shader(&mut self, kind: StageKind) -> Option<StageHandle> {
        (!self.fatal).then(|| self.objects.create_stage(kind))
    }

    fn shader_source(&mut self, shader: StageHandle, source: &str) {
        self.objects.set_source(shader, source);
    }

    fn compile_shader(&mut self, shader: StageHandle) {
        let Some(stage) = self.objects.stage(shader) else {
            log::debug!("wgpu: compile of unknown {shader}");
            return;
        };

        let device = self.gpu.device();
        let result = self.validator.compile(stage.kind, &stage.source).and_then(|iface| {
            let module = validated(device, || {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(stage.kind.label()),
                    source: wgpu::ShaderSource::Wgsl(stage.source.as_str().into()),
                })
            })?;
            Ok(CompiledShader { iface, module })
        });
        self.objects.finish_compile(shader, result);
    }

    fn shader_compile_status(&self, shader: StageHandle) -> bool {
        self.objects.compile_status(shader)
    }

    fn shader_info_log(&self, shader: StageHandle) -> String {
        self.objects.stage_log(shader)
    }

    fn delete_shader(&mut self, shader: StageHandle) {
        self.objects.delete_stage(shader);
    }

    fn create_program(&mut self) -> Option<ProgramHandle> {
        (!self.fatal).then(|| self.objects.create_program())
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: StageHandle) {
        self.objects.attach(program, shader);
    }

    fn link_program(&mut self, program: ProgramHandle) {
        if !self.objects.program_exists(program) {
            log::debug!("wgpu: link of unknown {program}");
            return;
        }
        let result = self.link(program);
        self.objects.finish_link(program, result);
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        self.objects.link_status(program)
    }

    fn program_info_log(&self, program: ProgramHandle) -> String {
        self.objects.program_log(program)
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        if !self.objects.use_program(program) {
            log::debug!("wgpu: use of unlinked program ignored");
        }
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.objects.delete_program(program);
    }

    fn create_buffer(&mut self) -> Option<BufferHandle> {
        (!self.fatal).then(|| self.objects.create_buffer())
    }

    fn bind_array_buffer(&mut self, buffer: Option<BufferHandle>) {
        self.objects.bind_array_buffer(buffer);
    }

    fn buffer_data_static(&mut self, data: &[f32]) {
        let device = self.gpu.device();
        let Some(buffer) = self.objects.buffer_data(data) else {
            log::debug!("wgpu: buffer data without a bound array buffer");
            return;
        };
        buffer.resource = (!data.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quadshade vertices"),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.objects.delete_buffer(buffer);
    }

    fn attrib_location(&self, program: ProgramHandle, name: &str) -> Option<AttribLocation> {
        self.objects.attrib_location(program, name)
    }

    fn vertex_attrib_pointer(&mut self, location: AttribLocation, layout: AttribLayout) {
        if let Err(reason) = self.objects.vertex_attrib_pointer(location, layout) {
            log::debug!("wgpu: {reason}");
        }
    }

    fn enable_vertex_attrib(&mut self, location: AttribLocation) {
        self.objects.enable_vertex_attrib(location);
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.objects.uniform_location(program, name)
    }

    fn uniform_3f(&mut self, location: UniformLocation, value: [f32; 3]) {
        if let Err(reason) = self.objects.set_uniform(location, &value) {
            log::debug!("wgpu: {reason}");
        }
    }

    fn uniform_2f(&mut self, location: UniformLocation, value: [f32; 2]) {
        if let Err(reason) = self.objects.set_uniform(location, &value) {
            log::debug!("wgpu: {reason}");
        }
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.objects.clear(color);
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        let clear = self.objects.take_clear();
        self.render(clear, Some((primitive, first, count)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::VertexInput;

    #[test]
    fn vertex_formats_follow_component_count() {
        assert_eq!(vertex_format(1), wgpu::VertexFormat::Float32);
        assert_eq!(vertex_format(2), wgpu::VertexFormat::Float32x2);
        assert_eq!(vertex_format(4), wgpu::VertexFormat::Float32x4);
    }

    #[test]
    fn primitives_map_to_list_topologies() {
        assert_eq!(topology(Primitive::Triangles), wgpu::PrimitiveTopology::TriangleList);
        assert_eq!(topology(Primitive::Lines), wgpu::PrimitiveTopology::LineList);
    }

    #[test]
    fn link_time_key_packs_every_input() {
        let iface = ProgramInterface {
            vertex_entry: "vs_main".into(),
            fragment_entry: "fs_main".into(),
            inputs: vec![
                VertexInput { name: "position".into(), location: 0, components: 2 },
                VertexInput { name: "tint".into(), location: 3, components: 4 },
            ],
            uniform_blocks: Vec::new(),
            uniforms: Vec::new(),
        };
        let key = PipelineKey::packed(&iface);
        assert_eq!(key.primitive, Primitive::Triangles);
        assert_eq!(
            key.attributes,
            vec![(0, AttribLayout::packed(2)), (3, AttribLayout::packed(4))]
        );

        let attrs = vertex_attributes(&key);
        assert_eq!(attrs[1][0].shader_location, 3);
        assert_eq!(attrs[1][0].format, wgpu::VertexFormat::Float32x4);
        assert_eq!(attrs[0][0].offset, 0);
    }

    #[test]
    fn offsets_carry_into_vertex_attributes() {
        let layout = AttribLayout { components: 3, normalized: false, stride: 20, offset: 8 };
        let key = PipelineKey { primitive: Primitive::Points, attributes: vec![(1, layout)] };
        let attrs = vertex_attributes(&key);
        assert_eq!(attrs[0][0].offset, 8);
        assert_eq!(attrs[0][0].format, wgpu::VertexFormat::Float32x3);
    }
}
