use thiserror::Error;

/// Why no frame could be acquired.
#[derive(Debug, Clone, Error)]
pub enum FrameError {
    /// The surface was lost or outdated and has been reconfigured.
    #[error("surface reconfigured ({0})")]
    Reconfigured(wgpu::SurfaceError),

    #[error("frame skipped ({0})")]
    Skipped(wgpu::SurfaceError),

    /// Nothing will be presented again.
    #[error("surface failed: {0}")]
    Fatal(wgpu::SurfaceError),
}

impl FrameError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Fatal(_))
    }
}

pub(crate) fn classify(err: wgpu::SurfaceError) -> FrameError {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => FrameError::Reconfigured(err),
        wgpu::SurfaceError::OutOfMemory => FrameError::Fatal(err),
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => FrameError::Skipped(err),
    }
}

/// One acquired surface texture and the encoder recording into it.
///
/// Hand it back to [`Gpu::present`](super::Gpu::present) promptly; the next
/// texture cannot be acquired while this one is held.
pub struct Frame {
    pub(crate) texture: wgpu::SurfaceTexture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) encoder: wgpu::CommandEncoder,
}

impl Frame {
    /// Begins the frame's color pass. `clear` replaces the previous contents;
    /// `None` draws over them.
    pub fn pass(&mut self, clear: Option<[f32; 4]>) -> wgpu::RenderPass<'_> {
        self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("quadshade pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: load_op(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

fn load_op(clear: Option<[f32; 4]>) -> wgpu::LoadOp<wgpu::Color> {
    match clear {
        Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }),
        None => wgpu::LoadOp::Load,
    }
}
