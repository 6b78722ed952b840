mod cli;
mod headless;
mod host;
mod watch;

use clap::Parser;
use quadshade_engine::logging::{init_logging, LoggingConfig};
use quadshade_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use cli::Cli;
use host::StudioApp;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(match &cli.log_filter {
        Some(filter) => LoggingConfig::with_filter(filter.clone()),
        None => LoggingConfig::default(),
    });

    if cli.headless {
        return headless::run(&cli);
    }

    let config = RuntimeConfig {
        title: "quadshade".to_string(),
        initial_size: LogicalSize::new(cli.width as f64, cli.height as f64),
        ..RuntimeConfig::default()
    };
    let surface = cli.surface_settings();
    Runtime::run(config, surface, StudioApp::new(cli))
}
