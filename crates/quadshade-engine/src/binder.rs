//! Geometry upload, attribute/uniform binding and the quad draw.

use crate::config::PipelineConfig;
use crate::gl::{AttribLayout, BufferHandle, GraphicsContext, Primitive};
use crate::linker::LinkedProgram;

/// Two triangles covering clip space, `(x, y)` per vertex.
pub const QUAD_VERTICES: [f32; 12] = [
    // tri 1
    -1.0, -1.0, // bottom left
    1.0, -1.0, // bottom right
    -1.0, 1.0, // top left
    // tri 2
    1.0, -1.0, // bottom right
    1.0, 1.0, // top right
    -1.0, 1.0, // top left
];

pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Vertex buffer holding [`QUAD_VERTICES`]. Written once, never modified.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct QuadBuffer {
    handle: BufferHandle,
}

impl QuadBuffer {
    /// Creates the buffer and uploads the quad. `None` if allocation fails.
    pub fn upload<C>(ctx: &mut C) -> Option<Self>
    where
        C: GraphicsContext + ?Sized,
    {
        let handle = ctx.create_buffer()?;
        ctx.bind_array_buffer(Some(handle));
        ctx.buffer_data_static(&QUAD_VERTICES);
        Some(Self { handle })
    }

    #[inline]
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn release<C>(self, ctx: &mut C)
    where
        C: GraphicsContext + ?Sized,
    {
        ctx.delete_buffer(self.handle);
    }
}

/// Parameters of the draw issued by [`bind_and_draw`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawReport {
    pub primitive: Primitive,
    pub vertex_count: u32,
    /// `None` when the program does not declare the uniform.
    pub color: Option<[f32; 3]>,
    pub resolution: Option<[f32; 2]>,
}

/// Binds `quad` and the uniforms from `config` to `program`, clears, and draws
/// the quad.
///
/// Holds no state between calls; identical inputs issue identical commands.
pub fn bind_and_draw<C>(
    ctx: &mut C,
    program: &LinkedProgram,
    quad: &QuadBuffer,
    config: &PipelineConfig,
) -> DrawReport
where
    C: GraphicsContext + ?Sized,
{
    let program = program.handle;
    ctx.bind_array_buffer(Some(quad.handle));

    match ctx.attrib_location(program, &config.position_attribute) {
        Some(loc) => {
            ctx.vertex_attrib_pointer(loc, AttribLayout::packed(2));
            ctx.enable_vertex_attrib(loc);
        }
        None => log::debug!(
            "program {program} has no `{}` attribute",
            config.position_attribute
        ),
    }

    ctx.use_program(Some(program));

    let color = ctx.uniform_location(program, "color").map(|loc| {
        ctx.uniform_3f(loc, config.color);
        config.color
    });

    let resolution = config.viewport.resolution();
    let resolution = ctx.uniform_location(program, "resolution").map(|loc| {
        ctx.uniform_2f(loc, resolution);
        resolution
    });

    if color.is_none() {
        log::debug!("program {program} has no `color` uniform");
    }
    if resolution.is_none() {
        log::debug!("program {program} has no `resolution` uniform");
    }

    ctx.clear(config.clear_color);
    ctx.draw_arrays(Primitive::Triangles, 0, QUAD_VERTEX_COUNT);

    DrawReport {
        primitive: Primitive::Triangles,
        vertex_count: QUAD_VERTEX_COUNT,
        color,
        resolution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessContext;
    use crate::compiler::compile_stage;
    use crate::gl::StageKind;
    use crate::linker::link_program;
    use crate::shader::{QUAD_FRAGMENT_WGSL, QUAD_VERTEX_WGSL};

    fn linked(ctx: &mut HeadlessContext) -> LinkedProgram {
        let vs = compile_stage(ctx, QUAD_VERTEX_WGSL, StageKind::Vertex).unwrap().unwrap();
        let fs = compile_stage(ctx, QUAD_FRAGMENT_WGSL, StageKind::Fragment).unwrap().unwrap();
        link_program(ctx, &vs, &fs).unwrap()
    }

    #[test]
    fn upload_writes_the_quad_once() {
        let mut ctx = HeadlessContext::new();
        let quad = QuadBuffer::upload(&mut ctx).unwrap();
        assert_eq!(ctx.buffer_contents(quad.handle()), Some(&QUAD_VERTICES[..]));
    }

    #[test]
    fn draws_six_vertex_triangle_list_with_uniforms() {
        let mut ctx = HeadlessContext::new();
        let program = linked(&mut ctx);
        let quad = QuadBuffer::upload(&mut ctx).unwrap();
        let config = PipelineConfig::default();

        let report = bind_and_draw(&mut ctx, &program, &quad, &config);
        assert_eq!(report.vertex_count, 6);
        assert_eq!(report.primitive, Primitive::Triangles);
        assert_eq!(report.color, Some([1.0, 0.5, 1.0]));
        assert_eq!(report.resolution, Some([800.0, 600.0]));

        let draw = &ctx.draws()[0];
        assert_eq!((draw.primitive, draw.first, draw.count), (Primitive::Triangles, 0, 6));
        assert_eq!(draw.uniform("resolution"), Some(&[800.0, 600.0][..]));
        assert_eq!(draw.attributes[0].layout, AttribLayout::packed(2));
        assert_eq!(draw.attributes[0].data, QUAD_VERTICES.to_vec());
    }

    #[test]
    fn repeated_draws_are_identical() {
        let mut ctx = HeadlessContext::new();
        let program = linked(&mut ctx);
        let quad = QuadBuffer::upload(&mut ctx).unwrap();
        let config = PipelineConfig::default();

        ctx.clear_log();
        let first = bind_and_draw(&mut ctx, &program, &quad, &config);
        let first_calls = ctx.calls().to_vec();
        ctx.clear_log();
        let second = bind_and_draw(&mut ctx, &program, &quad, &config);

        assert_eq!(first, second);
        assert_eq!(first_calls, ctx.calls());
    }

    #[test]
    fn missing_uniforms_are_skipped() {
        let fs_without_uniforms = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;
        let mut ctx = HeadlessContext::new();
        let vs = compile_stage(&mut ctx, QUAD_VERTEX_WGSL, StageKind::Vertex).unwrap().unwrap();
        let fs = compile_stage(&mut ctx, fs_without_uniforms, StageKind::Fragment)
            .unwrap()
            .unwrap();
        let program = link_program(&mut ctx, &vs, &fs).unwrap();
        let quad = QuadBuffer::upload(&mut ctx).unwrap();

        let report = bind_and_draw(&mut ctx, &program, &quad, &PipelineConfig::default());
        assert_eq!(report.color, None);
        assert_eq!(report.resolution, None);
        assert_eq!(ctx.draws().len(), 1);
    }
}
