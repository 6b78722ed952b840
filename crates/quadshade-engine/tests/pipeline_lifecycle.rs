//! End-to-end lifecycle behavior against the headless backend.

use std::time::{Duration, Instant};

use quadshade_engine::backend::headless::HeadlessContext;
use quadshade_engine::error::{CompileError, FetchError, LinkError, PipelineError};
use quadshade_engine::gl::{Primitive, StageKind};
use quadshade_engine::loader::{FileFetcher, ManualLoader, ThreadedLoader};
use quadshade_engine::pipeline::{PipelineState, ShaderPipeline};
use quadshade_engine::shader::{
    ShaderValidator, StageInterface, UniformBlock, UniformField, UniformType, VertexInput,
    QUAD_FRAGMENT_WGSL, QUAD_VERTEX_WGSL,
};
use quadshade_engine::PipelineConfig;

/// Accepts any text except text containing "invalid"; "unlinkable" fragment
/// stages compile but refuse to link.
struct ScriptedValidator;

impl ShaderValidator for ScriptedValidator {
    fn compile(&self, kind: StageKind, source: &str) -> Result<StageInterface, String> {
        if source.contains("invalid") {
            return Err(format!("0:1: syntax error in {kind} stage"));
        }

        let block = UniformBlock {
            group: 0,
            binding: 0,
            size: 32,
            fields: vec![
                UniformField { name: "color".into(), offset: 0, ty: UniformType::Vec3 },
                UniformField { name: "resolution".into(), offset: 16, ty: UniformType::Vec2 },
            ],
        };

        Ok(StageInterface {
            kind,
            entry_point: if source.contains("unlinkable") { "broken" } else { "main" }.into(),
            inputs: match kind {
                StageKind::Vertex => vec![VertexInput {
                    name: "position".into(),
                    location: 0,
                    components: 2,
                }],
                StageKind::Fragment => Vec::new(),
            },
            varyings: Vec::new(),
            uniform_blocks: vec![block],
        })
    }

    fn link(
        &self,
        vertex: &StageInterface,
        fragment: &StageInterface,
    ) -> Result<quadshade_engine::shader::ProgramInterface, String> {
        if fragment.entry_point == "broken" {
            return Err("fragment input `v_uv` has no matching vertex output".into());
        }
        quadshade_engine::shader::ProgramInterface::link(vertex, fragment)
    }
}

type Scripted = ShaderPipeline<HeadlessContext<ScriptedValidator>, ManualLoader>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scripted() -> (Scripted, ManualLoader) {
    init_logging();
    let loader = ManualLoader::new();
    let mut p = ShaderPipeline::new(PipelineConfig::default(), loader.clone());
    p.set_context(HeadlessContext::with_validator(ScriptedValidator));
    (p, loader)
}

fn ctx(p: &Scripted) -> &HeadlessContext<ScriptedValidator> {
    p.context().expect("context attached")
}

fn drawn(p: &mut Scripted, loader: &ManualLoader) {
    p.set_vertex_source_location("shaders/shader.vert");
    p.set_fragment_source_location("shaders/shader.frag");
    assert!(loader.complete(StageKind::Vertex, "valid vertex shader"));
    assert!(loader.complete(StageKind::Fragment, "valid fragment shader"));
    assert_eq!(p.poll(), 2);
    assert_eq!(p.state(), PipelineState::Drawn);
}

// ── happy path ────────────────────────────────────────────────────────────

#[test]
fn valid_pair_links_and_draws_once() {
    let (mut p, loader) = scripted();
    drawn(&mut p, &loader);

    let ctx = ctx(&p);
    assert_eq!(ctx.link_attempts(), 1);
    assert_eq!(ctx.draws().len(), 1);

    let draw = &ctx.draws()[0];
    assert_eq!(draw.primitive, Primitive::Triangles);
    assert_eq!((draw.first, draw.count), (0, 6));
    assert_eq!(draw.uniform("resolution"), Some(&[800.0, 600.0][..]));
    assert_eq!(draw.uniform("color"), Some(&[1.0, 0.5, 1.0][..]));
    assert_eq!(p.draw_count(), 1);
}

#[test]
fn either_stage_may_arrive_first() {
    let (mut p, loader) = scripted();
    p.set_vertex_source_location("a.vert");
    p.set_fragment_source_location("a.frag");

    loader.complete(StageKind::Fragment, "valid fragment shader");
    p.poll();
    assert_eq!(ctx(&p).link_attempts(), 0);

    loader.complete(StageKind::Vertex, "valid vertex shader");
    p.poll();
    assert_eq!(ctx(&p).link_attempts(), 1);
    assert_eq!(ctx(&p).draws().len(), 1);
}

// ── link gating ───────────────────────────────────────────────────────────

#[test]
fn link_is_never_attempted_with_one_stage() {
    let (mut p, loader) = scripted();
    p.set_vertex_source_location("a.vert");
    loader.complete(StageKind::Vertex, "valid vertex shader");
    p.poll();

    assert!(p.compiled_stage(StageKind::Vertex).is_some());
    assert_eq!(ctx(&p).link_attempts(), 0);
    assert_eq!(p.state(), PipelineState::Pending { vertex: false, fragment: true });
}

// ── failures ──────────────────────────────────────────────────────────────

#[test]
fn invalid_fragment_degrades_without_link_or_draw() {
    let (mut p, loader) = scripted();
    drawn(&mut p, &loader);

    p.set_fragment_source_location("shaders/broken.frag");
    loader.complete(StageKind::Fragment, "invalid fragment shader {");
    p.poll();

    assert!(p.compiled_stage(StageKind::Fragment).is_none());
    assert!(p.compiled_stage(StageKind::Vertex).is_some());
    assert_eq!(ctx(&p).link_attempts(), 1);
    assert_eq!(ctx(&p).draws().len(), 1);
    assert_eq!(p.state(), PipelineState::Degraded);

    match p.last_failure() {
        Some(PipelineError::Compile(CompileError::Rejected { kind, log, source_text })) => {
            assert_eq!(*kind, StageKind::Fragment);
            assert!(log.contains("syntax error"));
            assert_eq!(source_text, "invalid fragment shader {");
        }
        other => panic!("unexpected failure: {other:?}"),
    }
}

#[test]
fn link_failure_degrades_and_recovers() {
    let (mut p, loader) = scripted();
    p.set_vertex_source_location("a.vert");
    p.set_fragment_source_location("a.frag");
    loader.complete(StageKind::Vertex, "valid vertex shader");
    loader.complete(StageKind::Fragment, "unlinkable fragment shader");
    p.poll();

    assert_eq!(p.state(), PipelineState::Degraded);
    assert!(p.program().is_none());
    assert!(ctx(&p).draws().is_empty());
    assert!(matches!(p.last_failure(), Some(PipelineError::Link(_))));
    assert_eq!(ctx(&p).live_objects().1, 0);

    p.set_fragment_source_location("a.frag");
    loader.complete(StageKind::Fragment, "valid fragment shader");
    p.poll();
    assert_eq!(p.state(), PipelineState::Drawn);
    assert_eq!(ctx(&p).draws().len(), 1);
}

#[test]
fn failed_vertex_fetch_stays_pending_until_a_good_location() {
    let (mut p, loader) = scripted();
    p.set_vertex_source_location("missing.vert");
    p.set_fragment_source_location("a.frag");
    loader.fail(StageKind::Vertex, FetchError::EmptyLocation);
    loader.complete(StageKind::Fragment, "valid fragment shader");
    p.poll();

    assert_eq!(p.source_text(StageKind::Vertex), "");
    assert_eq!(ctx(&p).compile_attempts(StageKind::Vertex), 0);
    assert_eq!(p.state(), PipelineState::Pending { vertex: true, fragment: false });
    assert!(matches!(
        p.last_failure(),
        Some(PipelineError::Fetch { stage: StageKind::Vertex, .. })
    ));

    p.set_vertex_source_location("good.vert");
    loader.complete(StageKind::Vertex, "valid vertex shader");
    p.poll();
    assert_eq!(p.state(), PipelineState::Drawn);
}

// ── hot reload ────────────────────────────────────────────────────────────

#[test]
fn resetting_a_location_reruns_the_chain_and_releases_stale_objects() {
    let (mut p, loader) = scripted();
    drawn(&mut p, &loader);
    let first_program = p.program().unwrap();

    p.set_fragment_source_location("shaders/shader.frag");
    loader.complete(StageKind::Fragment, "valid fragment shader, edited");
    p.poll();

    let ctx = ctx(&p);
    assert_eq!(ctx.link_attempts(), 2);
    assert_eq!(ctx.draws().len(), 2);
    assert_ne!(p.program().unwrap(), first_program);
    // Two stages, one program, one quad buffer.
    assert_eq!(ctx.live_objects(), (2, 1, 1));
    assert_eq!(ctx.draws()[0], {
        let mut d = ctx.draws()[1].clone();
        d.program = first_program.handle;
        d
    });
}

#[test]
fn stale_load_never_overwrites_newer_text() {
    let (mut p, loader) = scripted();
    p.set_vertex_source_location("v1.vert");
    p.set_vertex_source_location("v2.vert");
    assert_eq!(loader.pending_count(), 2);

    // Newer completes first, older straggles in afterwards.
    assert!(loader.complete_generation(StageKind::Vertex, 2, "valid vertex shader v2"));
    assert_eq!(p.poll(), 1);
    assert!(loader.complete_generation(StageKind::Vertex, 1, "valid vertex shader v1"));
    assert_eq!(p.poll(), 0);

    assert_eq!(p.source_text(StageKind::Vertex), "valid vertex shader v2");
    assert_eq!(ctx(&p).compile_attempts(StageKind::Vertex), 1);
}

#[test]
fn stale_load_finishing_first_is_ignored() {
    let (mut p, loader) = scripted();
    p.set_vertex_source_location("v1.vert");
    p.set_vertex_source_location("v2.vert");

    loader.complete_generation(StageKind::Vertex, 1, "valid vertex shader v1");
    assert_eq!(p.poll(), 0);
    assert_eq!(p.source_text(StageKind::Vertex), "");
    assert!(p.has_pending_loads());

    loader.complete_generation(StageKind::Vertex, 2, "valid vertex shader v2");
    assert_eq!(p.poll(), 1);
    assert_eq!(p.source_text(StageKind::Vertex), "valid vertex shader v2");
    assert!(!p.has_pending_loads());
}

// ── real files, real WGSL ─────────────────────────────────────────────────

#[test]
fn threaded_file_loads_draw_builtin_quad() {
    init_logging();
    let dir = std::env::temp_dir().join(format!("quadshade-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("quad.vert.wgsl"), QUAD_VERTEX_WGSL).unwrap();
    std::fs::write(dir.join("quad.frag.wgsl"), QUAD_FRAGMENT_WGSL).unwrap();

    let loader = ThreadedLoader::new(FileFetcher::with_root(&dir));
    let mut p = ShaderPipeline::new(PipelineConfig::default(), loader);
    p.set_context(HeadlessContext::new());
    p.set_vertex_source_location("quad.vert.wgsl");
    p.set_fragment_source_location("file://quad.frag.wgsl");

    let deadline = Instant::now() + Duration::from_secs(10);
    while p.has_pending_loads() && Instant::now() < deadline {
        p.wait_for_load(Duration::from_millis(100));
    }

    assert_eq!(p.state(), PipelineState::Drawn);
    let ctx = p.context().unwrap();
    assert_eq!(ctx.draws().len(), 1);
    assert_eq!(ctx.draws()[0].uniform("color"), Some(&[1.0, 0.5, 1.0][..]));
}

const UV_FRAGMENT_WGSL: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;

fn wgsl() -> (ShaderPipeline<HeadlessContext, ManualLoader>, ManualLoader) {
    init_logging();
    let loader = ManualLoader::new();
    let mut p = ShaderPipeline::new(PipelineConfig::default(), loader.clone());
    p.set_context(HeadlessContext::new());
    p.set_vertex_source_location("quad.vert.wgsl");
    p.set_fragment_source_location("uv.frag.wgsl");
    (p, loader)
}

#[test]
fn unfed_fragment_input_fails_to_link() {
    let (mut p, loader) = wgsl();
    loader.complete(StageKind::Vertex, QUAD_VERTEX_WGSL);
    loader.complete(StageKind::Fragment, UV_FRAGMENT_WGSL);
    p.poll();

    assert!(p.compiled_stage(StageKind::Vertex).is_some());
    assert!(p.compiled_stage(StageKind::Fragment).is_some());
    assert_eq!(p.state(), PipelineState::Degraded);
    assert!(p.context().unwrap().draws().is_empty());
    match p.last_failure() {
        Some(PipelineError::Link(LinkError::Rejected { log })) => {
            assert!(log.contains("fragment input `uv`"), "{log}");
        }
        other => panic!("unexpected failure: {other:?}"),
    }
}

#[test]
fn matching_varyings_link_and_draw() {
    let (mut p, loader) = wgsl();
    let vertex = r#"
struct VsOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>) -> VsOut {
    return VsOut(vec4<f32>(position, 0.0, 1.0), position * 0.5 + 0.5);
}
"#;
    loader.complete(StageKind::Vertex, vertex);
    loader.complete(StageKind::Fragment, UV_FRAGMENT_WGSL);
    p.poll();

    assert_eq!(p.state(), PipelineState::Drawn);
    assert_eq!(p.context().unwrap().draws().len(), 1);
}

#[test]
fn integer_vertex_input_fails_to_compile() {
    let (mut p, loader) = wgsl();
    let vertex = r#"
@vertex
fn vs_main(@location(0) position: vec2<i32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(vec2<f32>(position), 0.0, 1.0);
}
"#;
    loader.complete(StageKind::Vertex, vertex);
    p.poll();

    assert!(p.compiled_stage(StageKind::Vertex).is_none());
    assert!(matches!(
        p.last_failure(),
        Some(PipelineError::Compile(CompileError::Rejected { kind: StageKind::Vertex, .. }))
    ));
}
