//! Program linking.

use crate::compiler::CompiledStage;
use crate::error::LinkError;
use crate::gl::{GraphicsContext, ProgramHandle};

/// A successfully linked program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LinkedProgram {
    pub handle: ProgramHandle,
}

/// Links a vertex and a fragment stage.
///
/// Callers gate on both stages being present; this function always attempts
/// the link. A rejected program is deleted before returning.
pub fn link_program<C>(
    ctx: &mut C,
    vertex: &CompiledStage,
    fragment: &CompiledStage,
) -> Result<LinkedProgram, LinkError>
where
    C: GraphicsContext + ?Sized,
{
    let handle = ctx.create_program().ok_or(LinkError::Allocation)?;

    ctx.attach_shader(handle, vertex.handle);
    ctx.attach_shader(handle, fragment.handle);
    ctx.link_program(handle);

    if !ctx.program_link_status(handle) {
        let log = ctx.program_info_log(handle);
        log::error!("error linking program: {log}");
        ctx.delete_program(handle);
        return Err(LinkError::Rejected { log });
    }

    log::debug!("linked program {handle}");
    Ok(LinkedProgram { handle })
}
