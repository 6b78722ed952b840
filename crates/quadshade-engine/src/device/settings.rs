/// How the window surface is configured for the quad.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceSettings {
    /// Render into an sRGB surface when one is offered, so `color` uniforms
    /// are treated as linear and encoded on store.
    pub srgb: bool,

    /// Present in display sync (FIFO). Without it the lowest-latency mode the
    /// surface offers is used.
    pub vsync: bool,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            srgb: true,
            vsync: true,
        }
    }
}
