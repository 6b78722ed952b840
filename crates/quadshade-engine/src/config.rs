//! Pipeline configuration.

use crate::coords::Viewport;

pub const DEFAULT_WIDTH: f32 = 800.0;
pub const DEFAULT_HEIGHT: f32 = 600.0;
pub const DEFAULT_COLOR: [f32; 3] = [1.0, 0.5, 1.0];

/// Inputs of the quad draw that are not shader source.
///
/// Everything here is a design-time constant for a given host, but injectable.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Source of the `resolution` uniform.
    pub viewport: Viewport,

    /// Value of the `color` uniform.
    pub color: [f32; 3],

    /// Straight RGBA used to clear before the draw.
    pub clear_color: [f32; 4],

    /// Vertex attribute fed from the quad buffer.
    pub position_attribute: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(DEFAULT_WIDTH, DEFAULT_HEIGHT),
            color: DEFAULT_COLOR,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            position_attribute: "position".to_owned(),
        }
    }
}

impl PipelineConfig {
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.color = color;
        self
    }
}
