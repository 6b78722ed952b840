use std::path::PathBuf;

use clap::Parser;
use quadshade_engine::config::{DEFAULT_COLOR, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use quadshade_engine::device::SurfaceSettings;
use quadshade_engine::{PipelineConfig, Viewport};

#[derive(Parser, Debug)]
#[command(name = "quadshade-studio", version, about = "Draw a WGSL shader pair over a full-screen quad")]
pub struct Cli {
    /// Vertex stage source.
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/quad.vert.wgsl"))]
    pub vertex: PathBuf,

    /// Fragment stage source.
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/quad.frag.wgsl"))]
    pub fragment: PathBuf,

    /// Window width in logical pixels.
    ///
    /// Headless runs use it as the `resolution` uniform. A window instead
    /// reports its drawable size in physical pixels, the unit of
    /// `@builtin(position)`, so on a HiDPI display `resolution` is this value
    /// times the scale factor.
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: f32,

    /// Window height in logical pixels; see `--width` for `resolution`.
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: f32,

    /// Value of the `color` uniform, as `R,G,B`.
    #[arg(long, value_parser = parse_color, default_value = "1.0,0.5,1.0")]
    pub color: [f32; 3],

    /// Run without a window, print the outcome and exit.
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Reload a stage whenever its file changes on disk.
    #[arg(long, default_value_t = false)]
    pub watch: bool,

    /// Present without waiting for display sync.
    #[arg(long, default_value_t = false)]
    pub no_vsync: bool,

    /// Render into a linear (non-sRGB) surface.
    #[arg(long, default_value_t = false)]
    pub linear: bool,

    /// Log filter in `env_logger` syntax (overrides RUST_LOG).
    #[arg(long = "log")]
    pub log_filter: Option<String>,
}

impl Cli {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_viewport(Viewport::new(self.width, self.height))
            .with_color(self.color)
    }

    pub fn surface_settings(&self) -> SurfaceSettings {
        SurfaceSettings {
            srgb: !self.linear,
            vsync: !self.no_vsync,
        }
    }
}

pub fn parse_color(s: &str) -> Result<[f32; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(format!("expected R,G,B, got `{s}`"));
    };

    let channel = |c: &str| {
        c.parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("`{c}` is not a number"))
    };
    Ok([channel(r)?, channel(g)?, channel(b)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parses_three_channels() {
        assert_eq!(parse_color("1.0, 0.5,1"), Ok([1.0, 0.5, 1.0]));
        assert!(parse_color("1.0,0.5").is_err());
        assert!(parse_color("1.0,x,0").is_err());
        assert!(parse_color("1,2,inf").is_err());
    }

    #[test]
    fn defaults_match_the_engine() {
        let cli = Cli::parse_from(["quadshade-studio"]);
        assert_eq!(cli.color, DEFAULT_COLOR);
        assert_eq!(cli.pipeline_config(), PipelineConfig::default());
        assert!(cli.vertex.ends_with("shaders/quad.vert.wgsl"));
        assert!(!cli.headless && !cli.watch);
        assert_eq!(cli.surface_settings(), SurfaceSettings::default());
    }

    #[test]
    fn surface_flags_map_to_settings() {
        let cli = Cli::parse_from(["quadshade-studio", "--no-vsync", "--linear"]);
        let settings = cli.surface_settings();
        assert!(!settings.vsync);
        assert!(!settings.srgb);
    }
}
