//! Window host: one surface, one pipeline.

use std::time::Duration;

use anyhow::Result;
use quadshade_engine::backend::WgpuContext;
use quadshade_engine::core::{App, AppControl};
use quadshade_engine::device::Gpu;
use quadshade_engine::loader::{FileFetcher, ThreadedLoader};
use quadshade_engine::{ShaderPipeline, Viewport};
use winit::dpi::PhysicalSize;

use crate::cli::Cli;
use crate::watch::SourceWatcher;

pub struct StudioApp {
    pipeline: ShaderPipeline<WgpuContext, ThreadedLoader<FileFetcher>>,
    cli: Cli,
    watcher: Option<SourceWatcher>,
}

impl StudioApp {
    pub fn new(cli: Cli) -> Self {
        let watcher = cli
            .watch
            .then(|| SourceWatcher::new(&cli.vertex, &cli.fragment, Duration::from_millis(250)));
        Self {
            pipeline: ShaderPipeline::new(cli.pipeline_config(), ThreadedLoader::new(FileFetcher::new())),
            cli,
            watcher,
        }
    }
}

/// Viewport in physical pixels, matching `@builtin(position)` in the
/// fragment stage. `None` while the window is minimized.
fn drawable_viewport(size: PhysicalSize<u32>) -> Option<Viewport> {
    (size.width > 0 && size.height > 0).then(|| Viewport::new(size.width as f32, size.height as f32))
}

impl App for StudioApp {
    fn on_gpu_ready(&mut self, gpu: Gpu) -> Result<()> {
        let size = gpu.size();
        self.pipeline.set_context(WgpuContext::new(gpu));
        self.on_resize(size);

        self.pipeline.set_vertex_source_location(self.cli.vertex.as_path());
        self.pipeline.set_fragment_source_location(self.cli.fragment.as_path());
        Ok(())
    }

    fn on_resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(ctx) = self.pipeline.context_mut() {
            ctx.resize(size);
        }
        if let Some(viewport) = drawable_viewport(size) {
            self.pipeline.set_viewport(viewport);
        }
    }

    fn on_redraw(&mut self) -> AppControl {
        self.pipeline.redraw();
        if self.pipeline.context().is_some_and(WgpuContext::is_lost) {
            log::error!("GPU surface lost; exiting");
            return AppControl::Exit;
        }
        AppControl::Continue
    }

    fn on_idle(&mut self) -> AppControl {
        if let Some(watcher) = &mut self.watcher {
            for (stage, path) in watcher.changed() {
                self.pipeline.set_source_location(stage, path.as_path());
            }
        }
        self.pipeline.poll();
        AppControl::Continue
    }
}
