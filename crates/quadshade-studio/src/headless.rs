//! Windowless run against the recording backend.

use std::time::{Duration, Instant};

use anyhow::bail;
use quadshade_engine::backend::HeadlessContext;
use quadshade_engine::loader::{FileFetcher, ThreadedLoader};
use quadshade_engine::{PipelineState, ShaderPipeline};

use crate::cli::Cli;
use crate::watch::SourceWatcher;

const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

type Pipeline = ShaderPipeline<HeadlessContext, ThreadedLoader<FileFetcher>>;

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut pipeline: Pipeline =
        ShaderPipeline::new(cli.pipeline_config(), ThreadedLoader::new(FileFetcher::new()));
    pipeline.set_context(HeadlessContext::new());
    pipeline.set_vertex_source_location(cli.vertex.as_path());
    pipeline.set_fragment_source_location(cli.fragment.as_path());

    settle(&mut pipeline);
    report(&pipeline);

    if cli.watch {
        let mut watcher = SourceWatcher::new(&cli.vertex, &cli.fragment, Duration::from_millis(250));
        log::info!("watching shader files; Ctrl-C to stop");
        loop {
            for (stage, path) in watcher.changed() {
                pipeline.set_source_location(stage, path.as_path());
            }
            if pipeline.has_pending_loads() {
                settle(&mut pipeline);
                report(&pipeline);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    if pipeline.state() != PipelineState::Drawn {
        match pipeline.last_failure() {
            Some(err) => bail!("shader pipeline did not draw: {err}"),
            None => bail!("shader pipeline did not draw ({})", pipeline.state()),
        }
    }
    Ok(())
}

fn settle(pipeline: &mut Pipeline) {
    let deadline = Instant::now() + LOAD_TIMEOUT;
    while pipeline.has_pending_loads() && Instant::now() < deadline {
        pipeline.wait_for_load(Duration::from_millis(100));
    }
    if pipeline.has_pending_loads() {
        log::warn!("gave up waiting for shader sources after {LOAD_TIMEOUT:?}");
    }
}

fn report(pipeline: &Pipeline) {
    println!("state: {}", pipeline.state());
    if let Some(draw) = pipeline.last_draw() {
        println!(
            "draw #{}: {:?}, {} vertices, color {:?}, resolution {:?}",
            pipeline.draw_count(),
            draw.primitive,
            draw.vertex_count,
            draw.color,
            draw.resolution
        );
    }
    if let Some(err) = pipeline.last_failure() {
        println!("last failure: {err}");
    }
}
