use std::fmt;

/// Observable lifecycle state of a [`ShaderPipeline`](super::ShaderPipeline).
///
/// ```text
/// Uninitialized -> ContextReady -> Pending -> BothCompiled -> Drawn
///                                     \            \
///                                      +-----------+--> Degraded
/// ```
///
/// `Degraded` is left as soon as the failing stage receives new text.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PipelineState {
    /// No drawing context yet.
    Uninitialized,
    /// Context present, no source location set.
    ContextReady,
    /// At least one stage has no compiled object yet. `true` = still waiting.
    Pending { vertex: bool, fragment: bool },
    /// Both stages compiled; a program has not been produced from them.
    BothCompiled,
    /// A program is linked and the quad has been drawn with it.
    Drawn,
    /// The latest compile or link failed. Nothing is drawn until new source arrives.
    Degraded,
}

impl PipelineState {
    #[inline]
    pub fn is_degraded(self) -> bool {
        self == PipelineState::Degraded
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Uninitialized => f.write_str("uninitialized"),
            PipelineState::ContextReady => f.write_str("context ready"),
            PipelineState::Pending { vertex, fragment } => match (vertex, fragment) {
                (true, true) => f.write_str("vertex+fragment pending"),
                (true, false) => f.write_str("vertex pending"),
                (false, true) => f.write_str("fragment pending"),
                (false, false) => f.write_str("pending"),
            },
            PipelineState::BothCompiled => f.write_str("both compiled"),
            PipelineState::Drawn => f.write_str("linked and drawn"),
            PipelineState::Degraded => f.write_str("degraded"),
        }
    }
}
