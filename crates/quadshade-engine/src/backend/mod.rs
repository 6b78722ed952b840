//! [`GraphicsContext`](crate::gl::GraphicsContext) implementations.
//!
//! - [`headless::HeadlessContext`]: CPU-only, records commands and draws
//! - [`gpu::WgpuContext`]: renders into a window surface through wgpu

pub mod gpu;
pub mod headless;

pub use gpu::WgpuContext;
pub use headless::{AttribSnapshot, DrawSnapshot, GlCall, HeadlessContext};
