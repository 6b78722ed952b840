//! Shader-program lifecycle orchestration.
//!
//! Dependency chain, recomputed eagerly on every upstream change:
//!
//! ```text
//! location --load--> text --compile--> stage --+
//!                                              +--link--> program --draw
//! location --load--> text --compile--> stage --+
//! ```
//!
//! A change never patches a derived object in place. The stale object is
//! released and the chain below it is rebuilt from the new input.

mod state;

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

pub use state::PipelineState;

use crate::binder::{bind_and_draw, DrawReport, QuadBuffer};
use crate::compiler::{compile_stage, CompiledStage};
use crate::config::PipelineConfig;
use crate::coords::Viewport;
use crate::error::PipelineError;
use crate::gl::{GraphicsContext, StageKind};
use crate::linker::{link_program, LinkedProgram};
use crate::loader::{LoadCompletion, LoadReply, LoadRequest, SourceLoader, SourceLocation};

#[derive(Default)]
struct StageSlot {
    location: Option<SourceLocation>,
    /// Bumped on every location set; only a load tagged with the current
    /// generation may replace `text`.
    generation: u64,
    loading: bool,
    text: String,
    compiled: Option<CompiledStage>,
    compile_failed: bool,
}

/// Owns a drawing context and keeps one full-screen-quad program built from two
/// independently loaded shader stages.
///
/// Single-threaded: all context calls happen inside the methods below, on the
/// caller's thread. Loads complete elsewhere and are applied by [`poll`] or
/// [`wait_for_load`].
///
/// [`poll`]: ShaderPipeline::poll
/// [`wait_for_load`]: ShaderPipeline::wait_for_load
pub struct ShaderPipeline<C: GraphicsContext, L: SourceLoader> {
    config: PipelineConfig,
    loader: L,
    tx: Sender<LoadCompletion>,
    rx: Receiver<LoadCompletion>,

    context: Option<C>,
    stages: [StageSlot; 2],
    quad: Option<QuadBuffer>,
    program: Option<LinkedProgram>,
    link_failed: bool,
    drawn: bool,

    last_draw: Option<DrawReport>,
    draw_count: u64,
    last_failure: Option<PipelineError>,
}

impl<C: GraphicsContext, L: SourceLoader> ShaderPipeline<C, L> {
    pub fn new(config: PipelineConfig, loader: L) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            loader,
            tx,
            rx,
            context: None,
            stages: Default::default(),
            quad: None,
            program: None,
            link_failed: false,
            drawn: false,
            last_draw: None,
            draw_count: 0,
            last_failure: None,
        }
    }

    // ── host mutation points ──────────────────────────────────────────────

    /// Installs the drawing context and rebuilds everything against it.
    ///
    /// Objects created on a previous context are released on that context first.
    pub fn set_context(&mut self, context: C) {
        self.release_gpu_objects();
        self.context = Some(context);
        log::info!("drawing context attached");

        for kind in StageKind::ALL {
            self.recompile(kind);
        }
        self.relink();
    }

    /// Detaches the context after releasing every object created on it.
    pub fn take_context(&mut self) -> Option<C> {
        self.release_gpu_objects();
        self.context.take()
    }

    pub fn set_vertex_source_location(&mut self, location: impl Into<SourceLocation>) {
        self.set_source_location(StageKind::Vertex, location);
    }

    pub fn set_fragment_source_location(&mut self, location: impl Into<SourceLocation>) {
        self.set_source_location(StageKind::Fragment, location);
    }

    /// Sets a stage's location and starts loading it.
    ///
    /// Always starts a fresh load, even for an unchanged location, and
    /// supersedes any load still in flight for the stage. An empty location
    /// only supersedes; nothing is fetched.
    pub fn set_source_location(&mut self, kind: StageKind, location: impl Into<SourceLocation>) {
        let location = location.into();
        let slot = &mut self.stages[kind.index()];
        slot.generation += 1;
        slot.location = Some(location.clone());

        if location.is_empty() {
            slot.loading = false;
            log::debug!("{kind} location cleared; no load started");
            return;
        }

        slot.loading = true;
        let request = LoadRequest {
            stage: kind,
            generation: slot.generation,
            location,
        };
        log::debug!(
            "loading {kind} source from `{}` (#{})",
            request.location,
            request.generation
        );
        self.loader.load(LoadReply::new(request, self.tx.clone()));
    }

    /// Changes the `resolution` input and redraws if a program is live.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.config.viewport == viewport {
            return;
        }
        self.config.viewport = viewport;
        self.redraw();
    }

    /// Re-issues the draw for the current program. Returns whether a draw ran.
    pub fn redraw(&mut self) -> bool {
        if self.program.is_none() {
            return false;
        }
        self.draw();
        true
    }

    // ── load completions ──────────────────────────────────────────────────

    /// Applies every completed load without blocking.
    ///
    /// Returns how many completions were applied (stale ones excluded).
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(done) => applied += usize::from(self.apply(done)),
                Err(TryRecvError::Empty) => return applied,
                // Unreachable while `self.tx` is alive.
                Err(TryRecvError::Disconnected) => return applied,
            }
        }
    }

    /// Blocks up to `timeout` for one completion and applies it.
    ///
    /// Returns `false` on timeout or when nothing is in flight.
    pub fn wait_for_load(&mut self, timeout: Duration) -> bool {
        if !self.has_pending_loads() {
            return false;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(done) => {
                self.apply(done);
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Whether any stage waits for its latest load.
    pub fn has_pending_loads(&self) -> bool {
        self.stages.iter().any(|s| s.loading)
    }

    fn apply(&mut self, done: LoadCompletion) -> bool {
        let LoadCompletion {
            stage: kind,
            generation,
            location,
            result,
        } = done;
        let slot = &mut self.stages[kind.index()];

        if generation != slot.generation {
            log::debug!(
                "discarding stale {kind} load #{generation} from `{location}` (current #{})",
                slot.generation
            );
            return false;
        }
        slot.loading = false;

        match result {
            Ok(text) => {
                log::info!("loaded {kind} source from `{location}` ({} bytes)", text.len());
                slot.text = text;
                self.recompile(kind);
                self.relink();
            }
            Err(error) => {
                log::warn!("failed to load {kind} source from `{location}`: {error}");
                self.last_failure = Some(PipelineError::Fetch { stage: kind, error });
            }
        }
        true
    }

    // ── derived objects ───────────────────────────────────────────────────

    fn recompile(&mut self, kind: StageKind) {
        let slot = &mut self.stages[kind.index()];
        slot.compile_failed = false;
        let stale = slot.compiled.take();

        let Some(ctx) = self.context.as_mut() else { return };
        if let Some(stale) = stale {
            ctx.delete_shader(stale.handle);
        }

        match compile_stage(ctx, &slot.text, kind) {
            Ok(compiled) => slot.compiled = compiled,
            Err(e) => {
                log::warn!("{kind} stage unavailable; pipeline degraded until new source arrives");
                slot.compile_failed = true;
                self.last_failure = Some(e.into());
            }
        }
    }

    fn relink(&mut self) {
        self.link_failed = false;
        self.drawn = false;
        let stale = self.program.take();

        let Some(ctx) = self.context.as_mut() else { return };
        if let Some(stale) = stale {
            ctx.use_program(None);
            ctx.delete_program(stale.handle);
        }

        let [vertex, fragment] = &self.stages;
        let (Some(vs), Some(fs)) = (&vertex.compiled, &fragment.compiled) else {
            return;
        };

        match link_program(ctx, vs, fs) {
            Ok(program) => {
                self.program = Some(program);
                self.draw();
            }
            Err(e) => {
                log::warn!("program unavailable; pipeline degraded until new source arrives");
                self.link_failed = true;
                self.last_failure = Some(e.into());
            }
        }
    }

    fn draw(&mut self) {
        let Some(ctx) = self.context.as_mut() else { return };
        let Some(program) = self.program else { return };

        if self.quad.is_none() {
            self.quad = QuadBuffer::upload(ctx);
        }
        let Some(quad) = self.quad else {
            log::error!("could not allocate the quad vertex buffer; skipping draw");
            return;
        };

        let report = bind_and_draw(ctx, &program, &quad, &self.config);
        log::info!(
            "drew {} vertices with program {} at {}x{}",
            report.vertex_count,
            program.handle,
            self.config.viewport.width,
            self.config.viewport.height
        );

        self.last_draw = Some(report);
        self.draw_count += 1;
        self.drawn = true;
    }

    fn release_gpu_objects(&mut self) {
        let program = self.program.take();
        let quad = self.quad.take();
        let stages: Vec<_> = self.stages.iter_mut().filter_map(|s| s.compiled.take()).collect();
        self.drawn = false;

        let Some(ctx) = self.context.as_mut() else { return };
        if let Some(program) = program {
            ctx.use_program(None);
            ctx.delete_program(program.handle);
        }
        for stage in stages {
            ctx.delete_shader(stage.handle);
        }
        if let Some(quad) = quad {
            ctx.bind_array_buffer(None);
            quad.release(ctx);
        }
    }

    // ── observation ───────────────────────────────────────────────────────

    pub fn state(&self) -> PipelineState {
        if self.context.is_none() {
            return PipelineState::Uninitialized;
        }
        if self.link_failed || self.stages.iter().any(|s| s.compile_failed) {
            return PipelineState::Degraded;
        }
        if self.program.is_some() && self.drawn {
            return PipelineState::Drawn;
        }

        let [vertex, fragment] = &self.stages;
        match (vertex.compiled.is_some(), fragment.compiled.is_some()) {
            (true, true) => PipelineState::BothCompiled,
            _ if vertex.location.is_none() && fragment.location.is_none() => {
                PipelineState::ContextReady
            }
            (v, f) => PipelineState::Pending {
                vertex: !v,
                fragment: !f,
            },
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    /// Direct context access for the host (e.g. surface resize). Objects owned by
    /// the pipeline must not be deleted through it.
    pub fn context_mut(&mut self) -> Option<&mut C> {
        self.context.as_mut()
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn source_location(&self, kind: StageKind) -> Option<&SourceLocation> {
        self.stages[kind.index()].location.as_ref()
    }

    /// Latest loaded text; empty until a load succeeds.
    pub fn source_text(&self, kind: StageKind) -> &str {
        &self.stages[kind.index()].text
    }

    pub fn compiled_stage(&self, kind: StageKind) -> Option<CompiledStage> {
        self.stages[kind.index()].compiled
    }

    pub fn program(&self) -> Option<LinkedProgram> {
        self.program
    }

    pub fn last_draw(&self) -> Option<&DrawReport> {
        self.last_draw.as_ref()
    }

    /// Draws issued since construction.
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    pub fn last_failure(&self) -> Option<&PipelineError> {
        self.last_failure.as_ref()
    }
}

impl<C: GraphicsContext, L: SourceLoader> Drop for ShaderPipeline<C, L> {
    fn drop(&mut self) {
        self.release_gpu_objects();
    }
}
