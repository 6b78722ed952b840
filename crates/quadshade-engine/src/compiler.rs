//! Single-stage compilation.

use crate::error::CompileError;
use crate::gl::{GraphicsContext, StageHandle, StageKind};

/// A successfully compiled stage object, tagged with its kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CompiledStage {
    pub handle: StageHandle,
    pub kind: StageKind,
}

/// Compiles `source` as a `kind` stage on `ctx`.
///
/// - Empty source yields `Ok(None)` without touching the context.
/// - A rejected stage is released, its log and source are logged, and the
///   error is returned for the caller to record.
pub fn compile_stage<C>(
    ctx: &mut C,
    source: &str,
    kind: StageKind,
) -> Result<Option<CompiledStage>, CompileError>
where
    C: GraphicsContext + ?Sized,
{
    if source.is_empty() {
        return Ok(None);
    }

    let handle = ctx
        .create_shader(kind)
        .ok_or(CompileError::Allocation { kind })?;

    ctx.shader_source(handle, source);
    ctx.compile_shader(handle);

    if !ctx.shader_compile_status(handle) {
        let log = ctx.shader_info_log(handle);
        log::error!("error compiling {kind} shader: {log}");
        log::error!("{kind} shader source:\n{source}");
        ctx.delete_shader(handle);

        return Err(CompileError::Rejected {
            kind,
            log,
            source_text: source.to_owned(),
        });
    }

    log::debug!("compiled {kind} shader {handle}");
    Ok(Some(CompiledStage { handle, kind }))
}
